//! Configuration loader with layered merging.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Each file added with [`ConfigLoader::with_file`], in order
//!
//! Each layer overrides the previous. Missing files are skipped.

use super::{ConfigError, RuntimeConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```no_run
/// use tessera_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_file("/etc/tessera/runtime.toml")
///     .with_file("./tessera.toml")
///     .load()?;
/// # Ok::<(), tessera_runtime::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    files: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Creates a loader with no file layers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file layer. Later layers override earlier ones.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Loads and merges every layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a file exists but cannot be read or
    /// parsed.
    pub fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        let mut config = RuntimeConfig::default();

        for path in &self.files {
            if let Some(layer) = Self::load_file(path)? {
                debug!(path = %path.display(), "Loaded runtime config");
                config.merge(&layer);
            }
        }

        Ok(config)
    }

    /// Loads a config file, returning None if it doesn't exist.
    fn load_file(path: &Path) -> Result<Option<RuntimeConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

        let config =
            RuntimeConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))?;

        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write config");
        path
    }

    #[test]
    fn load_defaults_only() {
        let config = ConfigLoader::new().load().expect("load");
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn missing_file_is_skipped() {
        let temp = TempDir::new().expect("tempdir");
        let config = ConfigLoader::new()
            .with_file(temp.path().join("absent.toml"))
            .load()
            .expect("load");
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn later_file_overrides_earlier() {
        let temp = TempDir::new().expect("tempdir");
        let first = write(
            temp.path(),
            "first.toml",
            r#"
[reconciler]
refresh_debounce_ms = 5

[bridge]
call_timeout_ms = 100
"#,
        );
        let second = write(
            temp.path(),
            "second.toml",
            r#"
[bridge]
call_timeout_ms = 200
"#,
        );

        let config = ConfigLoader::new()
            .with_file(first)
            .with_file(second)
            .load()
            .expect("load");
        assert_eq!(config.reconciler.refresh_debounce_ms, 5);
        assert_eq!(config.bridge.call_timeout_ms, 200);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let temp = TempDir::new().expect("tempdir");
        let path = write(temp.path(), "bad.toml", "[bridge\ncall_timeout_ms = ");

        let err = ConfigLoader::new()
            .with_file(&path)
            .load()
            .expect_err("parse error");
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }
}
