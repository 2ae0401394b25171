//! Path resolution for configured directories.
//!
//! Resolves relative and tilde-prefixed paths to absolute paths.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::ConfigError;

/// Resolves a configured directory to an absolute path.
///
/// Handles three cases:
/// - Tilde paths (`~/books`) - expanded to home directory
/// - Relative paths (`./data`, `../shared`) - resolved relative to `base_dir`
/// - Absolute paths (`/srv/books`) - returned as-is
///
/// The directory does not have to exist: the index directory is created on
/// first use and a missing data directory is reported by the indexer.
pub fn resolve_dir(path: &str, base_dir: &Path) -> Result<PathBuf, ConfigError> {
    let expanded = expand_tilde(path)?;

    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
    }
}

/// Expands a tilde prefix to the home directory.
///
/// - `~` alone becomes the home directory
/// - `~/foo` becomes home directory joined with `foo`
/// - Paths not starting with `~` are returned unchanged
fn expand_tilde(path: &str) -> Result<PathBuf, ConfigError> {
    if path == "~" {
        return home_dir();
    }

    if let Some(rest) = path.strip_prefix("~/") {
        let home = home_dir()?;
        return Ok(home.join(rest));
    }

    Ok(PathBuf::from(path))
}

/// Returns the home directory.
fn home_dir() -> Result<PathBuf, ConfigError> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDirectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDir;

    #[test]
    fn test_resolve_relative_path() {
        let test_dir = TestDir::new();
        let resolved = resolve_dir("data", test_dir.path()).unwrap();
        assert_eq!(resolved, test_dir.path().join("data"));
    }

    #[test]
    fn test_resolve_absolute_path() {
        let test_dir = TestDir::new();
        let absolute = test_dir.path().join("books");
        let resolved = resolve_dir(absolute.to_str().unwrap(), Path::new("/elsewhere")).unwrap();
        assert_eq!(resolved, absolute);
    }

    #[test]
    fn test_resolve_missing_directory_is_allowed() {
        let resolved = resolve_dir("not/yet/created", Path::new("/base")).unwrap();
        assert_eq!(resolved, PathBuf::from("/base/not/yet/created"));
    }

    #[test]
    fn test_expand_tilde() {
        let home = home_dir().unwrap();
        assert_eq!(expand_tilde("~").unwrap(), home);
        assert_eq!(expand_tilde("~/books").unwrap(), home.join("books"));
        assert_eq!(expand_tilde("books").unwrap(), PathBuf::from("books"));
    }
}
