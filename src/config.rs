//! Crate configuration.
//!
//! Every knob that affects cache layout or URL generation lives in one
//! explicit [`Config`] value passed at construction — there is no process-wide
//! mutable state. Config files are optional; the compiled-in defaults are
//! usable as-is.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! cache_root = "./cache"    # Where materialized images are stored
//! cache_depth = 2           # Shard subdirectory levels (clamped to 1-10)
//! url_mode = "base"         # "base", "root" or "absolute"
//! protocol_less = true      # Emit //host/... URLs (absolute mode only)
//! cdn_url = ""              # When set, overrides url_mode entirely
//! root_path = ""            # Filesystem directory public URLs map onto
//! ```
//!
//! ## Shard depth
//!
//! `cache_depth` bounds per-directory file counts: each level consumes one
//! more leading character of the source-path hash. A value of 0 is clamped to
//! 1 and anything above 10 is clamped to 10 rather than rejected, so a config
//! typo degrades layout, not availability.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// How public URLs are derived from cache paths.
///
/// - `Base`: relative to the directory the request URI points at
/// - `Root`: relative to the server root
/// - `Absolute`: full URL including scheme and host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlMode {
    #[default]
    Base,
    Root,
    Absolute,
}

/// Cache layout and URL generation settings.
///
/// All fields have usable defaults. Config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory materialized images are written to.
    pub cache_root: PathBuf,
    /// Number of hash-prefix shard levels under `cache_root`. Read through
    /// [`Config::shard_depth`], which clamps to the valid range.
    pub cache_depth: u32,
    /// URL generation mode. Ignored when `cdn_url` is set.
    pub url_mode: UrlMode,
    /// Strip the scheme from absolute URLs (`//host/path`). Only meaningful
    /// with [`UrlMode::Absolute`].
    pub protocol_less: bool,
    /// CDN prefix for generated URLs. When non-empty this wins over
    /// `url_mode` and `protocol_less`.
    pub cdn_url: String,
    /// The filesystem directory that public URLs map onto. Paths outside it
    /// are emitted verbatim.
    pub root_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from("./cache"),
            cache_depth: 2,
            url_mode: UrlMode::default(),
            protocol_less: true,
            cdn_url: String::new(),
            root_path: PathBuf::new(),
        }
    }
}

impl Config {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cdn_url.is_empty()
            && !(self.cdn_url.starts_with("http://")
                || self.cdn_url.starts_with("https://")
                || self.cdn_url.starts_with("//"))
        {
            return Err(ConfigError::Validation(format!(
                "cdn_url must start with http://, https:// or //: {}",
                self.cdn_url
            )));
        }
        if self.cache_root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "cache_root must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Shard depth clamped to the supported range [1, 10].
    pub fn shard_depth(&self) -> u32 {
        self.cache_depth.clamp(1, 10)
    }

    /// CDN prefix with a guaranteed trailing slash, or `None` when unset.
    pub fn cdn_prefix(&self) -> Option<String> {
        if self.cdn_url.is_empty() {
            return None;
        }
        if self.cdn_url.ends_with('/') {
            Some(self.cdn_url.clone())
        } else {
            Some(format!("{}/", self.cdn_url))
        }
    }
}
