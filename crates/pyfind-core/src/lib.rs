#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

mod core;

pub(crate) use crate::core::config;
pub(crate) use crate::core::runtime::{effects, process};

pub mod discovery {
    pub use crate::core::discovery::*;
}

pub use crate::core::config::context::CommandContext;
pub use crate::core::config::{
    Config, DiscoveryConfig, EnvSnapshot, GlobalOptions, ProbeConfig, DEFAULT_ENV_MANAGER,
};
pub use crate::core::discovery::{
    discover, discover_installations, probe_installation, DiscoveryError, PathProbe,
};
pub use crate::core::python::python_cli::{
    python_list, python_probe, PythonListRequest, PythonProbeRequest,
};
pub use crate::core::runtime::effects::{
    Effects, FileSystem, ProcessRunner, SharedEffects, SystemEffects,
};
pub use crate::core::runtime::process::{
    run_command, ProcessError, RunOptions, RunOutput, ShellSpec, SoftFailure,
};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};
