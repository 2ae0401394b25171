//! Configuration file discovery.
//!
//! Finds the `.folio.toml` that applies to a directory by walking up the
//! directory tree. The closest file wins; parent files are not merged.

use std::path::{Path, PathBuf};

/// The configuration filename.
pub const CONFIG_FILENAME: &str = ".folio.toml";

/// Returns the configuration file closest to `cwd`, if any.
///
/// Walks from `cwd` up to the filesystem root and stops at the first
/// `.folio.toml` that is a regular file.
pub fn discover_config_file(cwd: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_support::TestDir;

    #[test]
    fn test_discover_no_config() {
        let test_dir = TestDir::new();
        let subdir = test_dir.create_dir("a/b/c");

        let found = discover_config_file(&subdir);

        // A stray config above the temp dir would be outside our control.
        if let Some(path) = found {
            assert!(!path.starts_with(test_dir.path()));
        }
    }

    #[test]
    fn test_discover_config_in_ancestor() {
        let test_dir = TestDir::new();
        let config = test_dir.create_config("", "");
        let subdir = test_dir.create_dir("a/b/c");

        assert_eq!(discover_config_file(&subdir), Some(config));
    }

    #[test]
    fn test_closest_config_wins() {
        let test_dir = TestDir::new();
        let _outer = test_dir.create_config("", "");
        let inner = test_dir.create_config("library", "");
        let working_dir = test_dir.create_dir("library/shelf");

        assert_eq!(discover_config_file(&working_dir), Some(inner));
    }

    #[test]
    fn test_discover_from_directory_with_config() {
        let test_dir = TestDir::new();
        let config = test_dir.create_config("", "");

        assert_eq!(discover_config_file(test_dir.path()), Some(config));
    }

    #[test]
    fn test_discover_skips_non_file_config() {
        let test_dir = TestDir::new();
        let fake_config = test_dir.path().join(CONFIG_FILENAME);
        fs::create_dir_all(&fake_config).unwrap();
        let subdir = test_dir.create_dir("subdir");

        let found = discover_config_file(&subdir);
        assert_ne!(found, Some(fake_config));
    }
}
