//! Configuration file support for decompressor.
//!
//! Loads `decompressor.toml` from the working directory, falling back to the
//! user config directory. Command-line flags always win over file values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings loaded from `decompressor.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory holding archived sessions
    pub source: Option<PathBuf>,
    /// Directory exported sessions are written to
    pub output: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub unset_rrweb: Option<bool>,
    pub unset_network: Option<bool>,
    pub remove_duplicates: Option<bool>,
    pub prettify_content: Option<bool>,
    /// Extra event categories to drop
    #[serde(default)]
    pub strip: Vec<String>,
    /// Files processed concurrently
    pub jobs: Option<usize>,
    /// pretty, json or compact
    pub log_format: Option<String>,
    /// JSONL event log
    pub log_file: Option<PathBuf>,
    /// Settings for the `pack` command
    #[serde(default)]
    pub pack: PackConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PackConfig {
    /// Compression level, 0-10
    pub level: Option<u8>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "decompressor.toml";

impl ProjectConfig {
    /// Load configuration.
    ///
    /// With an explicit path the file must exist. Otherwise the working
    /// directory is searched first, then `<config dir>/decompressor/config.toml`.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if a file was found and parses successfully
    /// - `Ok(None)` if no file exists
    /// - `Err(...)` if the file exists but fails to parse (hard error)
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            return Self::load_file(path).map(Some);
        }

        let candidates = std::iter::once(working_dir.join(CONFIG_FILE_NAME)).chain(
            dirs::config_dir().map(|dir| dir.join("decompressor").join("config.toml")),
        );

        for path in candidates {
            if path.exists() {
                return Self::load_file(&path).map(Some);
            }
        }

        Ok(None)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_working_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
source = "archive"
output = "clean"
remove_duplicates = true
strip = ["console"]
jobs = 4
log_format = "json"

[pack]
level = 9
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(None, dir.path()).unwrap().unwrap();
        assert_eq!(config.source, Some(PathBuf::from("archive")));
        assert_eq!(config.output, Some(PathBuf::from("clean")));
        assert_eq!(config.remove_duplicates, Some(true));
        assert_eq!(config.unset_rrweb, None);
        assert_eq!(config.strip, vec!["console".to_string()]);
        assert_eq!(config.jobs, Some(4));
        assert_eq!(config.log_format.as_deref(), Some("json"));
        assert_eq!(config.pack.level, Some(9));
    }

    #[test]
    fn test_unknown_field_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "unset_everything = true\n").unwrap();

        assert!(ProjectConfig::load(Some(&path), dir.path()).is_err());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ProjectConfig::load(Some(&missing), dir.path()).is_err());
    }
}
