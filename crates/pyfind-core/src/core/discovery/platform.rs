use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use pyfind_domain::{
    is_posix_interpreter_name, normalize_lexically, parse_pathext, windows_interpreter_stem,
};

use crate::config::EnvSnapshot;

/// Host-specific rules, selected once per discovery pass.
pub trait PlatformRules: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Separator between entries of the search-path variable.
    fn path_delimiter(&self) -> char;

    fn search_path(&self, env: &EnvSnapshot) -> Option<OsString>;

    /// The candidate path for a directory entry, or `None` when the name does
    /// not look like an interpreter.
    fn interpreter_candidate(&self, dir: &Path, entry: &OsStr) -> Option<PathBuf>;

    /// Interpreter location inside an environment-manager environment root.
    fn env_interpreter(&self, env_root: &Path) -> PathBuf;

    fn follows_symlinks(&self) -> bool;

    /// Whether binaries may carry several architectures worth probing.
    fn inspects_architectures(&self) -> bool;

    /// Whether the search path can be read from a login shell.
    fn supports_login_shell(&self) -> bool;

    /// Drops candidates of one directory that name the same interpreter.
    fn collapse_aliases(&self, candidates: Vec<PathBuf>) -> Vec<PathBuf> {
        candidates
    }

    /// Split the search-path value into directories, dropping empty entries.
    fn search_dirs(&self, search_path: &OsStr) -> Vec<PathBuf> {
        split_entries(search_path, self.path_delimiter())
            .into_iter()
            .filter(|entry| !entry.as_os_str().is_empty())
            .collect()
    }
}

#[cfg(unix)]
fn split_entries(search_path: &OsStr, delimiter: char) -> Vec<PathBuf> {
    use std::os::unix::ffi::OsStrExt;

    let Ok(delimiter) = u8::try_from(delimiter) else {
        return vec![PathBuf::from(search_path)];
    };
    search_path
        .as_bytes()
        .split(|byte| *byte == delimiter)
        .map(|entry| PathBuf::from(OsStr::from_bytes(entry)))
        .collect()
}

#[cfg(not(unix))]
fn split_entries(search_path: &OsStr, delimiter: char) -> Vec<PathBuf> {
    match search_path.to_str() {
        Some(text) => text.split(delimiter).map(PathBuf::from).collect(),
        None => std::env::split_paths(search_path).collect(),
    }
}

/// Joins a directory entry onto its directory with `.` and `..` folded, so
/// every spelling of a directory yields the same candidate. A bare relative
/// name keeps its `./` prefix and is never resolved through the search path.
fn candidate_path(dir: &Path, name: &OsStr) -> PathBuf {
    let joined = normalize_lexically(&dir.join(name));
    let mut components = joined.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Path::new(".").join(joined),
        _ => joined,
    }
}

#[derive(Debug, Clone, Default)]
pub struct PosixRules {
    multi_arch: bool,
}

impl PosixRules {
    #[must_use]
    pub fn new(multi_arch: bool) -> Self {
        Self { multi_arch }
    }
}

impl PlatformRules for PosixRules {
    fn name(&self) -> &'static str {
        "posix"
    }

    fn path_delimiter(&self) -> char {
        ':'
    }

    fn search_path(&self, env: &EnvSnapshot) -> Option<OsString> {
        env.var_os("PATH").map(ToOwned::to_owned)
    }

    fn interpreter_candidate(&self, dir: &Path, entry: &OsStr) -> Option<PathBuf> {
        let name = entry.to_str()?;
        is_posix_interpreter_name(name).then(|| candidate_path(dir, entry))
    }

    fn env_interpreter(&self, env_root: &Path) -> PathBuf {
        candidate_path(&env_root.join("bin"), OsStr::new("python"))
    }

    fn follows_symlinks(&self) -> bool {
        true
    }

    fn inspects_architectures(&self) -> bool {
        self.multi_arch
    }

    fn supports_login_shell(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct WindowsRules {
    pathext: Vec<String>,
}

impl WindowsRules {
    #[must_use]
    pub fn new(pathext: Vec<String>) -> Self {
        Self { pathext }
    }

    #[must_use]
    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self::new(parse_pathext(env.var_ignore_case("PATHEXT")))
    }

    /// Lowercase stem and `PATHEXT` priority of an interpreter file name.
    fn stem_and_rank(&self, name: &str) -> Option<(String, usize)> {
        let stem = windows_interpreter_stem(name, &self.pathext)?;
        let lowered = name.to_ascii_lowercase();
        let rank = self
            .pathext
            .iter()
            .position(|ext| lowered.ends_with(ext.to_ascii_lowercase().as_str()))?;
        Some((stem, rank))
    }
}

impl PlatformRules for WindowsRules {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn path_delimiter(&self) -> char {
        ';'
    }

    fn search_path(&self, env: &EnvSnapshot) -> Option<OsString> {
        env.var_os_ignore_case("PATH").map(ToOwned::to_owned)
    }

    fn interpreter_candidate(&self, dir: &Path, entry: &OsStr) -> Option<PathBuf> {
        let name = entry.to_str()?;
        windows_interpreter_stem(name, &self.pathext).map(|_| candidate_path(dir, entry))
    }

    fn env_interpreter(&self, env_root: &Path) -> PathBuf {
        candidate_path(env_root, OsStr::new("python.exe"))
    }

    /// Keeps one file per stem, the one `PATHEXT` would pick first.
    fn collapse_aliases(&self, candidates: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut kept: Vec<(String, usize, PathBuf)> = Vec::new();
        for candidate in candidates {
            let Some((stem, rank)) = candidate
                .file_name()
                .and_then(OsStr::to_str)
                .and_then(|name| self.stem_and_rank(name))
            else {
                kept.push((String::new(), usize::MAX, candidate));
                continue;
            };
            match kept.iter_mut().find(|(seen, _, _)| *seen == stem) {
                Some(slot) if rank < slot.1 => {
                    slot.1 = rank;
                    slot.2 = candidate;
                }
                Some(_) => {}
                None => kept.push((stem, rank, candidate)),
            }
        }
        kept.into_iter().map(|(_, _, candidate)| candidate).collect()
    }

    fn follows_symlinks(&self) -> bool {
        false
    }

    fn inspects_architectures(&self) -> bool {
        false
    }

    fn supports_login_shell(&self) -> bool {
        false
    }
}

/// Rules for the platform this binary was built for.
#[must_use]
pub fn host_rules(env: &EnvSnapshot) -> Box<dyn PlatformRules> {
    if cfg!(windows) {
        Box::new(WindowsRules::from_env(env))
    } else {
        Box::new(PosixRules::new(cfg!(target_os = "macos")))
    }
}
