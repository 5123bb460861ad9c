pub(crate) mod context;
mod settings;

pub use settings::{
    Config, DiscoveryConfig, EnvSnapshot, GlobalOptions, ProbeConfig, DEFAULT_ENV_MANAGER,
};
