use std::path::{Component, Path, PathBuf};

/// Folds `.` and `..` components without touching the filesystem.
///
/// `..` above the root is dropped; `..` at the start of a relative path is
/// kept.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::ParentDir | Component::CurDir) | None => {
                    normalized.push("..");
                }
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_parent_and_current_components() {
        assert_eq!(
            normalize_lexically(Path::new("/usr/bin/../lib/./python3.12")),
            PathBuf::from("/usr/lib/python3.12")
        );
    }

    #[test]
    fn parent_of_root_stays_at_root() {
        assert_eq!(
            normalize_lexically(Path::new("/../../bin/python")),
            PathBuf::from("/bin/python")
        );
    }

    #[test]
    fn leading_parent_of_relative_path_is_kept() {
        assert_eq!(
            normalize_lexically(Path::new("../a/../../b")),
            PathBuf::from("../../b")
        );
    }
}
