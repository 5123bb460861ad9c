#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod installation;
pub mod naming;
pub mod paths;
pub mod version;

pub use installation::{Installation, InstallationId, InstallationInfo, InstallationSet};
pub use naming::{
    is_posix_interpreter_name, is_windows_interpreter_stem, parse_pathext,
    windows_interpreter_stem, DEFAULT_PATHEXT,
};
pub use paths::normalize_lexically;
pub use version::{parse_python_version, PythonVersion};
