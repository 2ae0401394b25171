//! Configuration system for folio.
//!
//! folio uses a TOML configuration file named `.folio.toml`. The file is found
//! by walking up the directory tree from the current working directory; the
//! closest file wins. Every key is optional and falls back to a default, so a
//! missing file is equivalent to an empty one.

#![warn(missing_docs)]

mod discovery;
mod error;
mod parse;
mod resolve;
mod templates;
#[cfg(test)]
mod test_support;

use std::path::{Path, PathBuf};

pub use discovery::{CONFIG_FILENAME, discover_config_file};
pub use error::ConfigError;
pub use parse::{
    RawConfig, RawLibrarySettings, RawSearchSettings, RawServerSettings, RawTitleSettings,
    parse_config_file, parse_config_str,
};
pub use resolve::resolve_dir;
use serde::{Deserialize, Serialize};
pub use templates::config_template;

/// Fully resolved configuration for folio.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    /// Library locations.
    pub library: LibrarySettings,
    /// Search behaviour.
    pub search: SearchSettings,
    /// Title cache settings.
    pub titles: TitleSettings,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Directory containing the config file that was loaded, if any.
    #[serde(skip)]
    pub config_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration for `cwd`.
    ///
    /// Discovers the closest `.folio.toml`, parses it, and resolves relative
    /// paths against the file's directory. With no config file, defaults are
    /// used and relative paths resolve against `cwd`.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        match discover_config_file(cwd) {
            Some(path) => Self::load_from_file(&path),
            None => Self::from_raw(RawConfig::default(), cwd, None),
        }
    }

    /// Loads configuration from a specific config file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = parse_config_file(path)?;
        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::from_raw(raw, &root, Some(path))
    }

    /// Applies defaults to a parsed config and resolves its paths against `base_dir`.
    ///
    /// `source` names the file for error messages.
    pub fn from_raw(
        raw: RawConfig,
        base_dir: &Path,
        source: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let source_path = source.map(Path::to_path_buf).unwrap_or_default();
        let library = raw.library.unwrap_or_default();
        let search = raw.search.unwrap_or_default();
        let titles = raw.titles.unwrap_or_default();
        let server = raw.server.unwrap_or_default();

        let search = SearchSettings {
            fast_highlight_threshold: search
                .fast_highlight_threshold
                .unwrap_or(DEFAULT_FAST_HIGHLIGHT_THRESHOLD),
            batch_size: positive(
                search.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
                &source_path,
                "search.batch_size",
            )?,
            debug_filename: search.debug_filename.filter(|name| !name.is_empty()),
        };

        let titles = TitleSettings {
            cache_capacity: positive(
                titles.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
                &source_path,
                "titles.cache_capacity",
            )?,
        };

        let library = LibrarySettings {
            data_dir: resolve_dir(
                library.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR),
                base_dir,
            )?,
            index_dir: resolve_dir(
                library.index_dir.as_deref().unwrap_or(DEFAULT_INDEX_DIR),
                base_dir,
            )?,
        };

        let server = ServerSettings {
            bind: server.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
        };

        Ok(Self {
            library,
            search,
            titles,
            server,
            config_root: source.map(|_| base_dir.to_path_buf()),
        })
    }

    /// Serializes the effective settings to TOML format.
    pub fn settings_to_toml(&self) -> String {
        toml::to_string_pretty(self).expect("settings serialization should not fail")
    }
}

/// Default PDF directory, relative to the config root.
const DEFAULT_DATA_DIR: &str = "data";

/// Default index directory, relative to the config root.
const DEFAULT_INDEX_DIR: &str = "index";

/// Default hit count above which the manual highlighter is used.
const DEFAULT_FAST_HIGHLIGHT_THRESHOLD: usize = 200;

/// Default number of books per batch event.
const DEFAULT_BATCH_SIZE: usize = 10;

/// Default title cache capacity.
const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default server listen address.
const DEFAULT_BIND: &str = "127.0.0.1:8087";

/// Rejects zero for settings that size buffers or caches.
fn positive(value: usize, path: &Path, key: &'static str) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            path: path.to_path_buf(),
            key,
            reason: "must be greater than zero",
        });
    }
    Ok(value)
}

/// Where the library and its index live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibrarySettings {
    /// Absolute path of the PDF directory.
    pub data_dir: PathBuf,
    /// Absolute path of the index directory.
    pub index_dir: PathBuf,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            index_dir: PathBuf::from(DEFAULT_INDEX_DIR),
        }
    }
}

/// Search-related settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchSettings {
    /// Hit count above which snippets use the manual highlighter.
    pub fast_highlight_threshold: usize,
    /// Number of books per streamed batch.
    pub batch_size: usize,
    /// Restrict results to one filename; `None` in normal operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_filename: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            fast_highlight_threshold: DEFAULT_FAST_HIGHLIGHT_THRESHOLD,
            batch_size: DEFAULT_BATCH_SIZE,
            debug_filename: None,
        }
    }
}

/// Title cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TitleSettings {
    /// Maximum number of titles kept.
    pub cache_capacity: usize,
}

impl Default for TitleSettings {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}
