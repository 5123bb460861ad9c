use std::io;
use std::path::{Path, PathBuf};

use pyfind_domain::{normalize_lexically, Installation, InstallationId, InstallationInfo, InstallationSet};
use tracing::{debug, trace, warn};

use crate::effects::FileSystem;

use super::errors::DiscoveryError;
use super::platform::PlatformRules;

/// Longest symlink chain followed from one candidate.
pub const MAX_LINK_HOPS: usize = 40;

/// Folds confirmed interpreters into an [`InstallationSet`], following
/// symlink chains so each real binary is recorded once.
pub struct IdentityResolver<'a> {
    fs: &'a dyn FileSystem,
    follow_symlinks: bool,
    installations: InstallationSet,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, rules: &dyn PlatformRules) -> Self {
        Self {
            fs,
            follow_symlinks: rules.follows_symlinks(),
            installations: InstallationSet::new(),
        }
    }

    /// True when `path` is already recorded as an id or a record path.
    #[must_use]
    pub fn is_known(&self, path: &Path) -> bool {
        self.installations.is_known(path)
    }

    /// Records `candidate` as a leaf and walks its symlink chain.
    ///
    /// Known candidates are ignored.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::ReadLink`] when a link cannot be read for a
    /// reason other than "not a symlink".
    pub fn admit(&mut self, candidate: &Path, info: InstallationInfo) -> Result<(), DiscoveryError> {
        if self.is_known(candidate) {
            trace!(path = %candidate.display(), "already recorded");
            return Ok(());
        }
        self.installations
            .insert(Installation::leaf(candidate, info.clone()));
        if self.follow_symlinks {
            self.walk_links(candidate, &info)?;
        }
        Ok(())
    }

    fn walk_links(&mut self, start: &Path, info: &InstallationInfo) -> Result<(), DiscoveryError> {
        let mut current = start.to_path_buf();
        for _ in 0..MAX_LINK_HOPS {
            let target = match self.fs.read_link(&current) {
                Ok(target) => target,
                Err(err) if err.kind() == io::ErrorKind::InvalidInput => return Ok(()),
                Err(source) => {
                    return Err(DiscoveryError::ReadLink {
                        path: current,
                        source,
                    })
                }
            };
            self.installations
                .mark_symlink(&InstallationId::new(current.clone()));
            let resolved = resolve_link_target(&current, &target);
            debug!(
                link = %current.display(),
                target = %resolved.display(),
                "followed symlink"
            );
            let id = InstallationId::new(resolved.clone());
            if self.installations.contains_id(&id) {
                self.installations.demote(&id);
                return Ok(());
            }
            self.installations
                .insert(Installation::link_target(resolved.clone(), info.clone()));
            current = resolved;
        }
        warn!(
            path = %start.display(),
            hops = MAX_LINK_HOPS,
            "symlink chain too long, stopped following"
        );
        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> InstallationSet {
        self.installations
    }
}

/// Resolves a link target against the link's own directory.
fn resolve_link_target(link: &Path, target: &Path) -> PathBuf {
    let joined = match link.parent() {
        Some(parent) => parent.join(target),
        None => target.to_path_buf(),
    };
    let absolute = std::path::absolute(&joined).unwrap_or(joined);
    normalize_lexically(&absolute)
}
