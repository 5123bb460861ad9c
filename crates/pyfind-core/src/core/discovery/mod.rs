//! Finding the Python interpreters installed on the host.
//!
//! A pass enumerates candidate paths, probes each distinct candidate on a
//! worker pool, then folds the confirmed interpreters into an
//! [`InstallationSet`] in enumeration order.

mod enumerate;
mod errors;
mod platform;
mod probe;
mod resolve;
#[cfg(test)]
pub(crate) mod test_support;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use pyfind_domain::InstallationSet;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::Config;
use crate::effects::{Effects, SystemEffects};

pub use enumerate::{enumerate_candidates, SearchPathScan};
pub use errors::DiscoveryError;
pub use platform::{host_rules, PlatformRules, PosixRules, WindowsRules};
pub use probe::{NotAnInterpreter, ProbeOutcome, Prober};
pub use resolve::{IdentityResolver, MAX_LINK_HOPS};

/// Result of probing a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathProbe {
    /// The path and every record reached through its symlink chain.
    Installations(InstallationSet),
    Rejected(NotAnInterpreter),
}

/// Runs a discovery pass with the host platform rules.
///
/// # Errors
/// Returns a [`DiscoveryError`] for structural failures; candidates that are
/// not interpreters are dropped silently.
pub fn discover_installations(
    effects: &dyn Effects,
    config: &Config,
) -> Result<InstallationSet, DiscoveryError> {
    let rules = host_rules(config.env());
    discover_with_rules(effects, config, rules.as_ref())
}

/// Discovery against the real host and process environment.
///
/// # Errors
/// Fails when the environment holds invalid `PYFIND_*` values or discovery
/// hits a structural failure.
pub fn discover() -> anyhow::Result<InstallationSet> {
    let config = Config::from_env()?;
    Ok(discover_installations(&SystemEffects::new(), &config)?)
}

/// # Errors
/// See [`discover_installations`].
pub fn discover_with_rules(
    effects: &dyn Effects,
    config: &Config,
    rules: &dyn PlatformRules,
) -> Result<InstallationSet, DiscoveryError> {
    let candidates = enumerate_candidates(effects, rules, config)?;
    let unique = unique_candidates(&candidates);
    debug!(
        candidates = candidates.len(),
        unique = unique.len(),
        platform = rules.name(),
        "probing candidates"
    );
    let prober = Prober::new(effects.process(), config, rules);
    let mut outcomes = probe_all(&prober, &unique, config.discovery().jobs)?;

    let mut resolver = IdentityResolver::new(effects.fs(), rules);
    for candidate in &candidates {
        if resolver.is_known(candidate) {
            debug!(path = %candidate.display(), "skipping known candidate");
            continue;
        }
        match outcomes.remove(candidate) {
            Some(ProbeOutcome::Interpreter(info)) => resolver.admit(candidate, info)?,
            Some(ProbeOutcome::NotAnInterpreter(reason)) => {
                debug!(path = %candidate.display(), %reason, "discarding candidate");
            }
            None => {}
        }
    }
    let installations = resolver.finish();
    info!(count = installations.len(), "discovery finished");
    Ok(installations)
}

/// Probes one path and resolves its symlink chain.
///
/// # Errors
/// See [`discover_installations`].
pub fn probe_installation(
    effects: &dyn Effects,
    config: &Config,
    path: &Path,
) -> Result<PathProbe, DiscoveryError> {
    let rules = host_rules(config.env());
    probe_with_rules(effects, config, rules.as_ref(), path)
}

/// # Errors
/// See [`discover_installations`].
pub fn probe_with_rules(
    effects: &dyn Effects,
    config: &Config,
    rules: &dyn PlatformRules,
    path: &Path,
) -> Result<PathProbe, DiscoveryError> {
    let prober = Prober::new(effects.process(), config, rules);
    let outcome = prober.probe(path).map_err(|source| DiscoveryError::Process {
        program: path.to_path_buf(),
        source,
    })?;
    match outcome {
        ProbeOutcome::Interpreter(info) => {
            let mut resolver = IdentityResolver::new(effects.fs(), rules);
            resolver.admit(path, info)?;
            Ok(PathProbe::Installations(resolver.finish()))
        }
        ProbeOutcome::NotAnInterpreter(reason) => Ok(PathProbe::Rejected(reason)),
    }
}

fn unique_candidates(candidates: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|candidate| seen.insert(candidate.as_path()))
        .cloned()
        .collect()
}

fn probe_all(
    prober: &Prober<'_>,
    candidates: &[PathBuf],
    jobs: Option<usize>,
) -> Result<HashMap<PathBuf, ProbeOutcome>, DiscoveryError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.unwrap_or(0))
        .thread_name(|index| format!("pyfind-probe-{index}"))
        .build()?;
    pool.install(|| {
        candidates
            .par_iter()
            .map(|candidate| {
                prober
                    .probe(candidate)
                    .map(|outcome| (candidate.clone(), outcome))
                    .map_err(|source| DiscoveryError::Process {
                        program: candidate.clone(),
                        source,
                    })
            })
            .collect()
    })
}
