/// TOML parsing and value validation.
pub mod parser;
/// Unknown-field warnings.
pub mod validator;

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of `config.toml`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Traversal defaults
    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// Traversal defaults layered under the command-line switches.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TrackingConfig {
    /// Extra glob patterns added to the built-in ignore list
    pub ignore_patterns: Vec<String>,
    /// Follow symlinks even without `-l`
    pub follow_symlinks: bool,
    /// Recurse even without `-r`
    pub recursive: bool,
}

/// Which signals `check` compares, and what it reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct CheckOptions {
    /// Skip the size comparison
    pub ignore_size: bool,
    /// Skip the modification time comparison
    pub ignore_mtime: bool,
    /// Compare access times
    pub check_atime: bool,
    /// Compare creation times
    pub check_ctime: bool,
    /// Never hash; entries that pass the cheap checks are `same file`
    pub ignore_hash: bool,
    /// Also report entries that did not change
    pub show_same_files: bool,
}

/// Which signals make `update` re-hash an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct UpdateOptions {
    /// A size change alone does not trigger re-hashing
    pub ignore_size: bool,
    /// A modification time change alone does not trigger re-hashing
    pub ignore_mtime: bool,
    /// An access time change triggers re-hashing
    pub check_atime: bool,
    /// A creation time change triggers re-hashing
    pub check_ctime: bool,
}

impl Config {
    /// Load configuration from a file.
    ///
    /// A missing file yields the defaults; nothing is created on disk.
    /// Unknown keys are reported on stderr but do not fail the load.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML or values of the wrong type
    /// - An ignore pattern is not a valid glob
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let config = parser::parse_config_file(path)?;
        validator::ConfigValidator::new().validate_config_file(path)?;
        Ok(config)
    }

    /// Load configuration from [`default_config_path`], or the defaults when
    /// there is no home directory.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

/// `~/.config/filecheck/config.toml`, if a home directory is known.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("filecheck").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults_without_creating_it() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");

        let config = Config::load(&path)?;
        assert_eq!(config, Config::default());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_full_file_loads() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[tracking]\nignore_patterns = [\"*.swp\", \"build\"]\nfollow_symlinks = true\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(
            config,
            Config {
                tracking: TrackingConfig {
                    ignore_patterns: vec!["*.swp".to_string(), "build".to_string()],
                    follow_symlinks: true,
                    recursive: false,
                },
            }
        );
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracking]\nrecursive = true\n")?;

        let config = Config::load(&path)?;
        assert!(config.tracking.recursive);
        assert!(!config.tracking.follow_symlinks);
        assert!(config.tracking.ignore_patterns.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_pattern_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracking]\nignore_patterns = [\"a**b\"]\n")?;

        let err = Config::load(&path).expect_err("invalid glob accepted");
        assert!(format!("{err:#}").contains("a**b"));
        Ok(())
    }

    #[test]
    fn test_default_config_path_location() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with(".config/filecheck/config.toml"));
        }
    }
}
