use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::process::{run_command, ProcessError, RunOptions, RunOutput};

pub trait ProcessRunner: Send + Sync {
    fn run(&self, args: &[String], options: &RunOptions) -> Result<RunOutput, ProcessError>;

    /// Resolves a program name the way the host would when spawning it.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

pub trait FileSystem: Send + Sync {
    /// Entry names of a directory, in no particular order.
    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<OsString>>;

    /// Raw target of a symlink. Fails with [`io::ErrorKind::InvalidInput`]
    /// when `path` is not a link.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;
}

pub trait Effects: Send + Sync {
    fn process(&self) -> &dyn ProcessRunner;
    fn fs(&self) -> &dyn FileSystem;
}

pub type SharedEffects = Arc<dyn Effects>;

pub struct SystemEffects {
    process: Arc<SystemProcessRunner>,
    fs: Arc<SystemFileSystem>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            process: Arc::new(SystemProcessRunner),
            fs: Arc::new(SystemFileSystem),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn process(&self) -> &dyn ProcessRunner {
        self.process.as_ref()
    }

    fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}

struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, args: &[String], options: &RunOptions) -> Result<RunOutput, ProcessError> {
        run_command(args, options)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        match which::which(program) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::debug!(program, %err, "program not found");
                None
            }
        }
    }
}

struct SystemFileSystem;

impl FileSystem for SystemFileSystem {
    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<OsString>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect()
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::read_link(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_fs_lists_directory_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("python3"), b"").expect("write");
        std::fs::create_dir(temp.path().join("lib")).expect("mkdir");

        let effects = SystemEffects::new();
        let mut names = effects.fs().read_dir_names(temp.path()).expect("list");
        names.sort();
        assert_eq!(names, vec![OsString::from("lib"), OsString::from("python3")]);
    }

    #[cfg(unix)]
    #[test]
    fn system_fs_reports_invalid_input_for_regular_files_unix() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("python3.12");
        std::fs::write(&file, b"").expect("write");
        let link = temp.path().join("python3");
        std::os::unix::fs::symlink("python3.12", &link).expect("symlink");

        let effects = SystemEffects::new();
        assert_eq!(
            effects.fs().read_link(&link).expect("read link"),
            PathBuf::from("python3.12")
        );
        let err = effects.fs().read_link(&file).expect_err("not a link");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
