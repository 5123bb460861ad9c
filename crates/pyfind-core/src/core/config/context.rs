use anyhow::Result;

use crate::config::{Config, EnvSnapshot, GlobalOptions};
use crate::effects::{Effects, SharedEffects};

pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a new command context with the provided global options.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be prepared.
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Result<Self> {
        Self::with_env(global, effects, EnvSnapshot::capture())
    }

    /// Like [`CommandContext::new`] but reads an explicit environment.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be prepared.
    pub fn with_env(
        global: &'a GlobalOptions,
        effects: SharedEffects,
        env: EnvSnapshot,
    ) -> Result<Self> {
        let config = Config::from_snapshot(env)?.with_overrides(global)?;
        Ok(Self {
            global,
            config,
            effects,
        })
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
