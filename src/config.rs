//! Settings module.
//!
//! Handles loading, validating, and merging the `tilemark.toml` settings file.
//! Stock defaults are overridden by whatever keys the user file sets.
//!
//! ## Settings File
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! notification = true    # Print a summary line after every run
//! folderswitch = true    # Save next to the original (false → use savepath)
//! clearlist = false      # Clear the recent-documents list before each run
//! suffix = true          # photo.jpg → photo.watermark.jpg
//! updatecheck = true     # Accepted for compatibility; no effect
//! subfolder = false      # Save into a with-watermark/ child directory
//! savepath = ["/exports"] # Output directory when folderswitch = false (first entry)
//!
//! quality = 90           # JPEG quality (1-100)
//! watermark = "mark.png" # Custom watermark image (omit for the built-in one)
//!
//! [processing]
//! max_processes = 4      # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! The first seven keys are the settings surface of the desktop app this tool
//! replaces, so an exported settings file can be dropped in unchanged.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Quality, WatermarkAsset, WatermarkConfig};
use crate::planner::OutputOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default settings file name, looked up in the working directory.
pub const SETTINGS_FILENAME: &str = "tilemark.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings loaded from `tilemark.toml`.
///
/// All fields have defaults. User files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Print a summary line once all jobs finish.
    pub notification: bool,
    /// Save output next to the source. When false, `savepath` is used.
    pub folderswitch: bool,
    /// Clear the recent-documents list at the start of each run.
    pub clearlist: bool,
    /// Append `.watermark` to output file names.
    pub suffix: bool,
    /// Kept for settings-file compatibility.
    pub updatecheck: bool,
    /// Write into a `with-watermark` child directory.
    pub subfolder: bool,
    /// Override directories. Only the first entry is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savepath: Option<Vec<PathBuf>>,
    /// JPEG encode quality (1-100).
    pub quality: u32,
    /// Custom watermark image; the built-in one is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<PathBuf>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notification: true,
            folderswitch: true,
            clearlist: false,
            suffix: true,
            updatecheck: true,
            subfolder: false,
            savepath: None,
            quality: 90,
            watermark: None,
            processing: ProcessingConfig::default(),
        }
    }
}

impl Settings {
    /// Validate values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quality == 0 || self.quality > 100 {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if let Some(paths) = &self.savepath {
            if !self.folderswitch && paths.is_empty() {
                return Err(ConfigError::Validation(
                    "savepath must not be empty when folderswitch = false".into(),
                ));
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The slice of settings the path planner reads.
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            use_original_folder: self.folderswitch,
            override_directory: self
                .savepath
                .as_ref()
                .and_then(|paths| paths.first().cloned()),
            use_subfolder: self.subfolder,
            append_suffix: self.suffix,
        }
    }

    /// Compositor configuration: watermark source and encode quality.
    pub fn watermark_config(&self) -> WatermarkConfig {
        WatermarkConfig {
            watermark: self
                .watermark
                .clone()
                .map(WatermarkAsset::File)
                .unwrap_or_default(),
            quality: Quality::new(self.quality),
            ..WatermarkConfig::default()
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel jobs.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Loading, merging, and validation
// =============================================================================

/// Returns the stock default settings as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Settings::default()).expect("default settings must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
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

/// Load a settings file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_settings(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_settings(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Settings, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let settings: Settings = merged.try_into()?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from `path`, falling back to stock defaults if it is missing.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    resolve_settings(stock_defaults_value(), load_raw_settings(path)?)
}

/// Returns a fully-commented stock `tilemark.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# tilemark settings
# =================
# Every key is optional. Values below are the defaults.

# Print a summary line after every run.
notification = true

# Save output next to the original photo. Set to false to use `savepath`.
folderswitch = true

# Clear the recent-documents list before each run.
clearlist = false

# Append ".watermark" to output names: photo.jpg → photo.watermark.jpg
# With both `suffix` and `subfolder` off the original is overwritten
# (it is staged to photo.jpg.tmp first and removed afterwards).
suffix = true

# Accepted for compatibility with desktop settings files. No effect.
updatecheck = true

# Save into a "with-watermark" directory next to the output location.
subfolder = false

# Output directory used when folderswitch = false. Only the first entry counts.
# savepath = ["/path/to/exports"]

# JPEG quality, 1-100.
quality = 90

# Custom watermark image (PNG with transparency works best).
# Omit to use the built-in watermark.
# watermark = "watermark.png"

[processing]
# Maximum parallel jobs. Omit for one per CPU core.
# max_processes = 4
"##
}
