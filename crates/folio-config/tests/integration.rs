//! Integration tests for folio-config.
//!
//! Tests the full configuration loading pipeline: discovery -> parse -> resolve.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use folio_config::{CONFIG_FILENAME, Config, ConfigError, config_template};

/// Test helper to create a temporary directory structure for tests.
struct TestEnv {
    root: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates a directory and returns its path.
    fn create_dir(&self, rel_path: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Creates a file with content and returns its path.
    fn create_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}

#[test]
fn test_load_no_config_returns_defaults() {
    let env = TestEnv::new();
    let cwd = env.create_dir("empty");
    let config = Config::load(&cwd).unwrap();

    assert_eq!(config.search.batch_size, 10);
    assert_eq!(config.search.fast_highlight_threshold, 200);
    assert_eq!(config.server.bind, "127.0.0.1:8087");
    assert_eq!(config.library.data_dir, cwd.join("data"));
}

#[test]
fn test_load_full_config() {
    let env = TestEnv::new();
    env.create_file(
        CONFIG_FILENAME,
        r#"
[library]
data_dir = "/srv/books"
index_dir = "state/index"

[search]
fast_highlight_threshold = 5
batch_size = 3
debug_filename = "GA_004.pdf"

[titles]
cache_capacity = 2

[server]
bind = "0.0.0.0:9000"
"#,
    );

    let config = Config::load(env.path()).unwrap();

    assert_eq!(config.library.data_dir, PathBuf::from("/srv/books"));
    assert_eq!(config.library.index_dir, env.path().join("state/index"));
    assert_eq!(config.search.fast_highlight_threshold, 5);
    assert_eq!(config.search.batch_size, 3);
    assert_eq!(config.search.debug_filename.as_deref(), Some("GA_004.pdf"));
    assert_eq!(config.titles.cache_capacity, 2);
    assert_eq!(config.server.bind, "0.0.0.0:9000");
}

#[test]
fn test_invalid_toml_reports_path() {
    let env = TestEnv::new();
    let path = env.create_file(CONFIG_FILENAME, "[search\nbatch_size = 3\n");

    let err = Config::load(env.path()).unwrap_err();
    match err {
        ConfigError::ParseToml { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_zero_cache_capacity_is_rejected() {
    let env = TestEnv::new();
    env.create_file(CONFIG_FILENAME, "[titles]\ncache_capacity = 0\n");

    let err = Config::load(env.path()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            key: "titles.cache_capacity",
            ..
        }
    ));
}

#[test]
fn test_written_template_loads_as_defaults() {
    let env = TestEnv::new();
    env.create_file(CONFIG_FILENAME, &config_template());

    let config = Config::load(env.path()).unwrap();
    assert_eq!(config.library.data_dir, env.path().join("data"));
    assert_eq!(config.titles.cache_capacity, 1000);
    assert_eq!(config.config_root.as_deref(), Some(env.path()));
}
