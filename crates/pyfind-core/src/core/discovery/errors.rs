use std::io;
use std::path::PathBuf;

use crate::process::ProcessError;

/// Failures that abort a discovery pass.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to list search-path directory {}", .dir.display())]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read symlink {}", .path.display())]
    ReadLink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read PATH from login shell {}", .shell.display())]
    SearchPath {
        shell: PathBuf,
        #[source]
        source: ProcessError,
    },
    #[error("failed to run {}", .program.display())]
    Process {
        program: PathBuf,
        #[source]
        source: ProcessError,
    },
    #[error("failed to start probe workers")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
