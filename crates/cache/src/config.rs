//! Surface cache configuration
//!
//! Configuration can be loaded from a TOML file, environment variables,
//! or created programmatically.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Seconds between garbage-collection sweeps
pub const GC_INTERVAL_SECONDS: f64 = 3.0;

/// Configuration for a [`SurfaceCache`](crate::SurfaceCache).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceCacheConfig {
    /// Minimum wall-clock time between two sweeps, in seconds
    pub gc_interval_secs: f64,
    /// Request smoothed drawing contexts from the allocator
    pub smooth: bool,
    /// Prefix of the allocation label (`<prefix><key>/<sub_key>`)
    pub label_prefix: String,
    /// Drop primary keys whose sub-cache became empty during a sweep
    pub prune_empty_groups: bool,
}

impl Default for SurfaceCacheConfig {
    fn default() -> Self {
        Self {
            gc_interval_secs: GC_INTERVAL_SECONDS,
            smooth: true,
            label_prefix: "buffer-".to_string(),
            prune_empty_groups: false,
        }
    }
}

impl SurfaceCacheConfig {
    /// Sets the sweep interval in seconds.
    pub fn with_gc_interval(mut self, secs: f64) -> Self {
        self.gc_interval_secs = secs;
        self
    }

    /// Sets context smoothing.
    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    /// Sets the allocation label prefix.
    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }

    /// Sets whether empty sub-caches are dropped after a sweep.
    pub fn with_prune_empty_groups(mut self, prune: bool) -> Self {
        self.prune_empty_groups = prune;
        self
    }

    /// Returns the default configuration file for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/surface-cache/config.toml
    /// - Linux: ~/.config/surface-cache/config.toml
    /// - Windows: %APPDATA%\surface-cache\config.toml
    pub fn default_config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("surface-cache").join("config.toml")
        } else {
            PathBuf::from("surface-cache.toml")
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SURFACE_CACHE_GC_INTERVAL_SECS`: sweep interval in seconds (default: 3)
    /// - `SURFACE_CACHE_SMOOTH`: `true`/`false` (default: true)
    /// - `SURFACE_CACHE_LABEL_PREFIX`: allocation label prefix (default: `buffer-`)
    /// - `SURFACE_CACHE_PRUNE_EMPTY_GROUPS`: `true`/`false` (default: false)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SURFACE_CACHE_GC_INTERVAL_SECS") {
            config.gc_interval_secs = val.trim().parse::<f64>().map_err(|_| {
                ConfigError::InvalidValue("SURFACE_CACHE_GC_INTERVAL_SECS".to_string())
            })?;
        }

        if let Ok(val) = std::env::var("SURFACE_CACHE_SMOOTH") {
            config.smooth = val
                .trim()
                .parse::<bool>()
                .map_err(|_| ConfigError::InvalidValue("SURFACE_CACHE_SMOOTH".to_string()))?;
        }

        if let Ok(val) = std::env::var("SURFACE_CACHE_LABEL_PREFIX") {
            config.label_prefix = val;
        }

        if let Ok(val) = std::env::var("SURFACE_CACHE_PRUNE_EMPTY_GROUPS") {
            config.prune_empty_groups = val.trim().parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue("SURFACE_CACHE_PRUNE_EMPTY_GROUPS".to_string())
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format:
    /// ```toml
    /// gc_interval_secs = 3.0
    /// smooth = true
    /// label_prefix = "buffer-"
    /// prune_empty_groups = false
    /// ```
    ///
    /// Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Converts configuration to TOML format.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.gc_interval_secs.is_finite() || self.gc_interval_secs <= 0.0 {
            return Err(ConfigError::InvalidValue("gc_interval_secs".to_string()));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
