//! Configuration management for Archive Batch Processor.
//!
//! This module provides:
//! - TOML-based application configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - A per-batch project store holding step completion flags
//!
//! # Example
//!
//! ```no_run
//! use abp_core::config::{ConfigManager, ConfigSection};
//!
//! // Create manager and load (or create default) config
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create().unwrap();
//!
//! // Read settings
//! println!("JPEG quality: {}", config.settings().imaging.jpeg_quality);
//!
//! // Modify a setting
//! config.settings_mut().logging.compact = false;
//!
//! // Save just the logging section atomically
//! config.update_section(ConfigSection::Logging).unwrap();
//! ```

mod manager;
mod project;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use project::{ConfigStore, ProjectConfig};
pub use settings::{
    ConfigSection, ExportSettings, ImagingSettings, LoggingSettings, MetadataSettings,
    PathSettings, Settings, WatermarkCorner, WatermarkSettings,
};
