use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::effects::{Effects, FileSystem};
use crate::process::{ShellSpec, SoftFailure};

use super::errors::DiscoveryError;
use super::platform::PlatformRules;

const ENV_LIST_ARGS: [&str; 3] = ["env", "list", "--json"];
const DEFAULT_LOGIN_SHELL: &str = "/bin/sh";

#[derive(Debug, Deserialize)]
struct EnvListing {
    envs: Vec<PathBuf>,
}

/// Lazily walks the search-path directories, yielding interpreter candidates.
///
/// Missing directories and entries that are not directories are skipped; any
/// other listing failure is yielded once and ends the scan.
pub struct SearchPathScan<'a> {
    fs: &'a dyn FileSystem,
    rules: &'a dyn PlatformRules,
    dirs: std::vec::IntoIter<PathBuf>,
    pending: std::vec::IntoIter<PathBuf>,
    failed: bool,
}

impl<'a> SearchPathScan<'a> {
    pub fn new(fs: &'a dyn FileSystem, rules: &'a dyn PlatformRules, search_path: &OsStr) -> Self {
        Self {
            fs,
            rules,
            dirs: rules.search_dirs(search_path).into_iter(),
            pending: Vec::new().into_iter(),
            failed: false,
        }
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        let mut names = match self.fs.read_dir_names(dir) {
            Ok(names) => names,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                debug!(dir = %dir.display(), "skipping search-path entry that is not a directory");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(DiscoveryError::ReadDir {
                    dir: dir.to_path_buf(),
                    source,
                })
            }
        };
        names.sort();
        let candidates = names
            .iter()
            .filter_map(|name| self.rules.interpreter_candidate(dir, name))
            .collect();
        Ok(self.rules.collapse_aliases(candidates))
    }
}

impl Iterator for SearchPathScan<'_> {
    type Item = Result<PathBuf, DiscoveryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(candidate) = self.pending.next() {
                return Some(Ok(candidate));
            }
            let dir = self.dirs.next()?;
            match self.list(&dir) {
                Ok(candidates) => self.pending = candidates.into_iter(),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Every candidate path, search-path entries first, not yet deduplicated.
///
/// # Errors
/// Fails on directory listing errors other than "missing" or "not a
/// directory", and when the login-shell PATH query fails.
pub fn enumerate_candidates(
    effects: &dyn Effects,
    rules: &dyn PlatformRules,
    config: &Config,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let search_path = search_path(effects, rules, config)?;
    let mut candidates =
        SearchPathScan::new(effects.fs(), rules, &search_path).collect::<Result<Vec<_>, _>>()?;
    debug!(count = candidates.len(), "search-path candidates");
    candidates.extend(env_manager_candidates(effects, rules, config)?);
    Ok(candidates)
}

fn search_path(
    effects: &dyn Effects,
    rules: &dyn PlatformRules,
    config: &Config,
) -> Result<OsString, DiscoveryError> {
    if config.discovery().path_from_shell {
        if rules.supports_login_shell() {
            return login_shell_search_path(effects, config);
        }
        debug!(platform = rules.name(), "login-shell PATH is not supported here");
    }
    Ok(rules.search_path(config.env()).unwrap_or_default())
}

fn login_shell_search_path(
    effects: &dyn Effects,
    config: &Config,
) -> Result<OsString, DiscoveryError> {
    let shell = PathBuf::from(
        config
            .env()
            .var_os("SHELL")
            .filter(|shell| !shell.is_empty())
            .unwrap_or(OsStr::new(DEFAULT_LOGIN_SHELL)),
    );
    let options = config.run_options().shell(ShellSpec {
        program: shell.clone(),
        login: true,
    });
    let args = ["printf", "%s", "\"$PATH\""].map(String::from);
    let output = effects
        .process()
        .run(&args, &options)
        .map_err(|source| DiscoveryError::SearchPath {
            shell: shell.clone(),
            source,
        })?;
    debug!(shell = %shell.display(), path = %output.stdout, "read PATH from login shell");
    Ok(OsString::from(output.stdout))
}

/// Interpreters of the environments reported by the environment manager.
///
/// A missing, failing or misbehaving manager contributes nothing.
fn env_manager_candidates(
    effects: &dyn Effects,
    rules: &dyn PlatformRules,
    config: &Config,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let Some(tool) = config.discovery().env_manager.as_deref() else {
        debug!("environment manager disabled");
        return Ok(Vec::new());
    };
    let Some(program) = effects.process().locate(tool) else {
        debug!(tool, "environment manager not installed");
        return Ok(Vec::new());
    };
    let mut args = vec![program.to_string_lossy().into_owned()];
    args.extend(ENV_LIST_ARGS.map(String::from));
    let output = effects
        .process()
        .run(&args, &config.run_options())
        .soft()
        .map_err(|source| DiscoveryError::Process {
            program: program.clone(),
            source,
        })?;
    let Some(output) = output else {
        warn!(tool, "environment manager did not list environments");
        return Ok(Vec::new());
    };
    let listing: EnvListing = match serde_json::from_str(&output.stdout) {
        Ok(listing) => listing,
        Err(err) => {
            warn!(tool, %err, "ignoring unparseable environment listing");
            return Ok(Vec::new());
        }
    };
    debug!(tool, count = listing.envs.len(), "environment manager listed environments");
    Ok(listing
        .envs
        .iter()
        .map(|root| rules.env_interpreter(root))
        .collect())
}
