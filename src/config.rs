//! Tool configuration module.
//!
//! Handles loading, validating, and merging `gina.toml`. Stock defaults are
//! the base layer; a user file overrides only the keys it names.
//!
//! ## Config File Location
//!
//! `gina` looks for `gina.toml` in the working directory, or uses the file
//! given with `--config`. A missing `gina.toml` means stock defaults; a
//! missing `--config` file is an error.
//!
//! ## Configuration Options
//!
//! ```toml
//! # Defaults shown; every key may be omitted
//!
//! [decode]
//! auto_orientation = false  # Apply the EXIF orientation when opening JPEGs
//! pipe_capacity = 16        # Chunks the decoder may run ahead of the orientation reader
//!
//! [encode]
//! jpeg_quality = 95         # 1-100
//! png_compression = "default"  # "fast", "default" or "best"
//!
//! [processing]
//! max_threads = 4           # Worker threads (omit for auto = CPU cores)
//!
//! [logging]
//! level = "info"            # trace, debug, info, warn, error
//! format = "pretty"         # "pretty" or "json"
//! ```
//!
//! Unknown sections and keys are an error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::imaging::{DecodeOptions, EncodeOptions, PngCompression};

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "gina.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `gina.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GinaConfig {
    /// Decoding behaviour.
    pub decode: DecodeConfig,
    /// Encoder settings for saved images.
    pub encode: EncodeConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Log verbosity and format.
    pub logging: LoggingConfig,
}

impl GinaConfig {
    /// Reject values the decoder, encoders or logger cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.encode.jpeg_quality) {
            return Err(ConfigError::Validation(
                "encode.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.decode.pipe_capacity == 0 {
            return Err(ConfigError::Validation(
                "decode.pipe_capacity must be at least 1".into(),
            ));
        }
        if self.processing.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_threads must be at least 1".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

/// Decoding behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    /// Apply the EXIF orientation tag after decoding.
    pub auto_orientation: bool,
    /// Bounded hand-off between decoder and orientation reader, in chunks.
    pub pipe_capacity: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        let options = DecodeOptions::default();
        Self {
            auto_orientation: options.auto_orientation,
            pipe_capacity: options.pipe_capacity,
        }
    }
}

impl DecodeConfig {
    pub fn to_options(&self) -> DecodeOptions {
        DecodeOptions {
            auto_orientation: self.auto_orientation,
            pipe_capacity: self.pipe_capacity,
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeConfig {
    /// JPEG quality (1 = worst, 100 = best).
    pub jpeg_quality: u8,
    /// PNG deflate effort.
    pub png_compression: PngCompression,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        let options = EncodeOptions::default();
        Self {
            jpeg_quality: options.jpeg_quality,
            png_compression: options.png_compression,
        }
    }
}

impl EncodeConfig {
    pub fn to_options(&self) -> EncodeOptions {
        EncodeOptions {
            jpeg_quality: self.jpeg_quality,
            png_compression: self.png_compression,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Upper bound on worker threads; `None` means one per core.
    pub max_threads: Option<usize>,
}

/// Worker threads for the rayon pool: every core when unset, otherwise
/// `max_threads` capped at the core count.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// [`GinaConfig::default`] as a TOML table, the base layer for merging.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GinaConfig::default()).expect("default config must serialize")
}

/// Deep-merge `overlay` into `base`: tables merge per key, any other
/// overlay value replaces the base value, and base keys the overlay does
/// not mention survive.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load `gina.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `gina.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    load_raw_file(&config_path).map(Some)
}

/// Apply `overlay` (if any) to `base`, deserialize, and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GinaConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GinaConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective configuration.
///
/// An explicit `file` must exist; otherwise `gina.toml` in `dir` is used
/// when present, stock defaults when not.
pub fn load_config(file: Option<&Path>, dir: &Path) -> Result<GinaConfig, ConfigError> {
    let overlay = match file {
        Some(path) => Some(load_raw_file(path)?),
        None => load_raw_config(dir)?,
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Documented stock `gina.toml`, printed by `gina gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# gina Configuration
# ==================
# Every key is optional; the values below are the built-in defaults.
#
# gina reads gina.toml from the working directory, or the file passed
# with --config. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Decoding
# ---------------------------------------------------------------------------
[decode]
# Rotate/flip JPEGs according to their EXIF orientation tag.
# Same as passing --auto-orient on the command line.
auto_orientation = false

# Chunks the decoder may read ahead of the orientation reader before
# it has to wait.
pipe_capacity = 16

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encode]
# JPEG quality (1 = worst, 100 = best).
jpeg_quality = 95

# PNG compression effort: "fast", "default" or "best".
png_compression = "default"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum worker threads for blur/sharpen/mosaic.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# One of: trace, debug, info, warn, error. RUST_LOG overrides this.
level = "info"

# "pretty" for humans, "json" for log collectors. Logs go to stderr.
format = "pretty"
"##
}
