use std::collections::HashMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::process::{RunOptions, DEFAULT_MAX_CAPTURE_BYTES, DEFAULT_TIMEOUT};

pub const DEFAULT_ENV_MANAGER: &str = "conda";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
    pub no_color: bool,
    pub timeout_ms: Option<u64>,
    pub jobs: Option<usize>,
    pub conda: Option<String>,
    pub no_conda: bool,
    pub shell_path: bool,
}

/// Process environment captured once per invocation.
///
/// Values are kept as `OsString` so a search path holding non-UTF-8
/// directories survives intact.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, OsString>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value)))
                .collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<OsString>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn flag_is_enabled(&self, key: &str) -> bool {
        matches!(self.var(key), Some("1"))
    }

    /// The value of `key` when it is set and valid UTF-8.
    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.var_os(key).and_then(OsStr::to_str)
    }

    #[must_use]
    pub fn var_os(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(key).map(OsString::as_os_str)
    }

    /// Looks a variable up ignoring ASCII case, preferring an exact match.
    #[must_use]
    pub fn var_os_ignore_case(&self, key: &str) -> Option<&OsStr> {
        self.var_os(key).or_else(|| {
            self.vars
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, value)| value.as_os_str())
        })
    }

    #[must_use]
    pub fn var_ignore_case(&self, key: &str) -> Option<&str> {
        self.var_os_ignore_case(key).and_then(OsStr::to_str)
    }

    /// A `PYFIND_*` setting; set but not UTF-8 is an error.
    fn setting(&self, key: &str) -> Result<Option<&str>> {
        match self.var_os(key) {
            Some(raw) => raw
                .to_str()
                .map(Some)
                .with_context(|| format!("{key} is not valid UTF-8")),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        Self::from_pairs(pairs.iter().copied())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) env: EnvSnapshot,
    pub(crate) probe: ProbeConfig,
    pub(crate) discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeConfig {
    pub timeout: Duration,
    pub max_capture_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Environment manager queried for extra interpreters; `None` disables it.
    pub env_manager: Option<String>,
    /// Probe workers; `None` uses the available parallelism.
    pub jobs: Option<usize>,
    pub path_from_shell: bool,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if a `PYFIND_*` variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(EnvSnapshot::capture())
    }

    /// # Errors
    /// Returns an error if a `PYFIND_*` variable holds an invalid value.
    pub fn from_snapshot(snapshot: EnvSnapshot) -> Result<Self> {
        let timeout = match snapshot.setting("PYFIND_TIMEOUT_MS")? {
            Some(raw) => Duration::from_millis(
                parse_positive(raw).context("PYFIND_TIMEOUT_MS must be a positive integer")?,
            ),
            None => DEFAULT_TIMEOUT,
        };
        let max_capture_bytes = match snapshot.setting("PYFIND_MAX_CAPTURE_BYTES")? {
            Some(raw) => usize::try_from(
                parse_positive(raw)
                    .context("PYFIND_MAX_CAPTURE_BYTES must be a positive integer")?,
            )
            .context("PYFIND_MAX_CAPTURE_BYTES is too large")?,
            None => DEFAULT_MAX_CAPTURE_BYTES,
        };
        let jobs = match snapshot.setting("PYFIND_JOBS")? {
            Some(raw) => Some(
                usize::try_from(
                    parse_positive(raw).context("PYFIND_JOBS must be a positive integer")?,
                )
                .context("PYFIND_JOBS is too large")?,
            ),
            None => None,
        };
        let env_manager = match snapshot.setting("PYFIND_CONDA")?.map(str::trim) {
            Some(value) if is_disabled(value) => None,
            Some(value) => Some(value.to_string()),
            None => Some(DEFAULT_ENV_MANAGER.to_string()),
        };
        let path_from_shell = snapshot.flag_is_enabled("PYFIND_PATH_FROM_SHELL");

        Ok(Self {
            probe: ProbeConfig {
                timeout,
                max_capture_bytes,
            },
            discovery: DiscoveryConfig {
                env_manager,
                jobs,
                path_from_shell,
            },
            env: snapshot,
        })
    }

    /// Applies command-line overrides on top of the environment.
    ///
    /// # Errors
    /// Returns an error if an override holds an invalid value.
    pub fn with_overrides(mut self, global: &GlobalOptions) -> Result<Self> {
        if let Some(timeout_ms) = global.timeout_ms {
            if timeout_ms == 0 {
                bail!("--timeout-ms must be a positive integer");
            }
            self.probe.timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(jobs) = global.jobs {
            if jobs == 0 {
                bail!("--jobs must be a positive integer");
            }
            self.discovery.jobs = Some(jobs);
        }
        if let Some(tool) = &global.conda {
            self.discovery.env_manager = Some(tool.clone());
        }
        if global.no_conda {
            self.discovery.env_manager = None;
        }
        if global.shell_path {
            self.discovery.path_from_shell = true;
        }
        Ok(self)
    }

    #[must_use]
    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    #[must_use]
    pub fn probe(&self) -> &ProbeConfig {
        &self.probe
    }

    #[must_use]
    pub fn discovery(&self) -> &DiscoveryConfig {
        &self.discovery
    }

    /// Options every subprocess spawned during discovery starts from.
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            timeout: self.probe.timeout,
            max_capture_bytes: self.probe.max_capture_bytes,
            ..RunOptions::default()
        }
    }
}

fn parse_positive(raw: &str) -> Result<u64> {
    let value = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("invalid value `{raw}`"))?;
    if value == 0 {
        bail!("value must be greater than zero");
    }
    Ok(value)
}

fn is_disabled(value: &str) -> bool {
    let lowered = value.to_ascii_lowercase();
    matches!(lowered.as_str(), "" | "0" | "off" | "false" | "none")
}
