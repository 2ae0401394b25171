//! Configuration file parsing.
//!
//! Parses a `.folio.toml` file into an intermediate `RawConfig` that keeps
//! every key optional, so defaults are applied in one place.

use std::{fs, path::Path};

use serde::Deserialize;
#[cfg(test)]
use toml::de::Error as TomlError;

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
///
/// This mirrors the TOML schema exactly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    /// Library location section.
    pub library: Option<RawLibrarySettings>,
    /// Search behaviour section.
    pub search: Option<RawSearchSettings>,
    /// Title cache section.
    pub titles: Option<RawTitleSettings>,
    /// HTTP server section.
    pub server: Option<RawServerSettings>,
}

/// Raw `[library]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawLibrarySettings {
    /// Directory holding the PDF files.
    pub data_dir: Option<String>,
    /// Directory holding the search index.
    pub index_dir: Option<String>,
}

/// Raw `[search]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawSearchSettings {
    /// Hit count above which the manual highlighter is used.
    pub fast_highlight_threshold: Option<usize>,
    /// Number of books per streamed batch.
    pub batch_size: Option<usize>,
    /// Restrict results to this filename (debugging aid).
    pub debug_filename: Option<String>,
}

/// Raw `[titles]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawTitleSettings {
    /// Maximum number of cached titles.
    pub cache_capacity: Option<usize>,
}

/// Raw `[server]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawServerSettings {
    /// Socket address to listen on.
    pub bind: Option<String>,
}

/// Parses a configuration file from disk.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses configuration from a TOML string without path context.
#[cfg(test)]
pub fn parse_config(contents: &str) -> Result<RawConfig, TomlError> {
    toml::from_str(contents)
}
