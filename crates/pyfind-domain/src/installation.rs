use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::version::PythonVersion;

/// Symlink-resolved path of an interpreter, the deduplication key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(PathBuf);

impl InstallationId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Metadata gathered by probing an interpreter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationInfo {
    pub version: PythonVersion,
    /// Architectures of a multi-arch binary; `None` when the host cannot tell.
    pub architectures: Option<Vec<String>>,
    pub is_virtual_env: bool,
    pub supports_virtual_env: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: InstallationId,
    pub path: PathBuf,
    pub leaf: bool,
    pub symlink: bool,
    pub info: InstallationInfo,
}

impl Installation {
    /// A record found directly by enumeration.
    pub fn leaf(path: impl Into<PathBuf>, info: InstallationInfo) -> Self {
        Self::at(path.into(), true, info)
    }

    /// A record reached only by following another record's symlink.
    pub fn link_target(path: impl Into<PathBuf>, info: InstallationInfo) -> Self {
        Self::at(path.into(), false, info)
    }

    fn at(path: PathBuf, leaf: bool, info: InstallationInfo) -> Self {
        Self {
            id: InstallationId::new(path.clone()),
            path,
            leaf,
            symlink: false,
            info,
        }
    }
}

/// Discovered installations keyed by id.
///
/// Each id maps to exactly one record; inserting a second record for a known
/// id is refused.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InstallationSet {
    records: BTreeMap<InstallationId, Installation>,
}

impl InstallationSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &InstallationId) -> Option<&Installation> {
        self.records.get(id)
    }

    #[must_use]
    pub fn get_path(&self, path: &Path) -> Option<&Installation> {
        self.records.get(&InstallationId::new(path))
    }

    #[must_use]
    pub fn contains_id(&self, id: &InstallationId) -> bool {
        self.records.contains_key(id)
    }

    /// True when `path` is either a known id or the path of some record.
    #[must_use]
    pub fn is_known(&self, path: &Path) -> bool {
        self.records.contains_key(&InstallationId::new(path))
            || self.records.values().any(|record| record.path == path)
    }

    /// Inserts a record whose id is not yet present. Returns false and leaves
    /// the set untouched otherwise.
    pub fn insert(&mut self, installation: Installation) -> bool {
        if self.records.contains_key(&installation.id) {
            return false;
        }
        self.records.insert(installation.id.clone(), installation);
        true
    }

    /// Marks the record as reachable through a symlink. Leaf status is only
    /// ever cleared, never set.
    pub fn demote(&mut self, id: &InstallationId) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.leaf = false;
                true
            }
            None => false,
        }
    }

    pub fn mark_symlink(&mut self, id: &InstallationId) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.symlink = true;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Installation> {
        self.records.values()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Installation> {
        self.iter().filter(|record| record.leaf)
    }

    /// Keeps only records matching the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&Installation) -> bool) {
        self.records.retain(|_, record| keep(record));
    }
}

impl IntoIterator for InstallationSet {
    type Item = Installation;
    type IntoIter = std::collections::btree_map::IntoValues<InstallationId, Installation>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values()
    }
}
