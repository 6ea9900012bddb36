//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Worksheet CSV export settings.
    #[serde(default)]
    pub export: ExportSettings,

    /// Derivative generation settings.
    #[serde(default)]
    pub imaging: ImagingSettings,

    /// Metadata embedding settings.
    #[serde(default)]
    pub metadata: MetadataSettings,

    /// Watermark compositing settings.
    #[serde(default)]
    pub watermark: WatermarkSettings,
}

/// Path configuration for batch data and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder holding batch directories.
    #[serde(default = "default_data_root")]
    pub data_root: String,

    /// Folder for application-level log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_data_root() -> String {
    "batches".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of error lines to show in tail.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Log full external tool argument lists.
    #[serde(default)]
    pub show_command_args: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_command_args: false,
        }
    }
}

/// Worksheet CSV export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Field delimiter for the exported CSV (first byte is used).
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Write a header row.
    #[serde(default = "default_true")]
    pub include_headers: bool,
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            include_headers: true,
        }
    }
}

impl ExportSettings {
    /// Delimiter byte for the csv writer.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.bytes().next().unwrap_or(b',')
    }
}

/// Derivative generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagingSettings {
    /// JPEG quality for format conversion (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Longest-edge bound in pixels for resized derivatives.
    #[serde(default = "default_max_edge")]
    pub max_edge: u32,
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_max_edge() -> u32 {
    1200
}

impl Default for ImagingSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
            max_edge: default_max_edge(),
        }
    }
}

/// Metadata embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataSettings {
    /// Path to the exiftool executable (empty = find in PATH).
    #[serde(default)]
    pub exiftool_path: String,

    /// Value written to the Software/CreatorTool tag.
    #[serde(default = "default_creator_tool")]
    pub creator_tool: String,
}

fn default_creator_tool() -> String {
    "Archive Batch Processor".to_string()
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            exiftool_path: String::new(),
            creator_tool: default_creator_tool(),
        }
    }
}

/// Corner where the watermark is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// Watermark compositing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkSettings {
    /// Path to the watermark image (PNG with alpha).
    #[serde(default)]
    pub file: String,

    /// Watermark opacity percentage (0-100).
    #[serde(default = "default_opacity_pct")]
    pub opacity_pct: u8,

    /// Margin from the anchored corner in pixels.
    #[serde(default = "default_margin_px")]
    pub margin_px: u32,

    /// Watermark width as a percentage of the image width.
    #[serde(default = "default_scale_pct")]
    pub scale_pct: u8,

    /// Corner the watermark is anchored to.
    #[serde(default)]
    pub corner: WatermarkCorner,
}

fn default_opacity_pct() -> u8 {
    40
}

fn default_margin_px() -> u32 {
    24
}

fn default_scale_pct() -> u8 {
    20
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            file: String::new(),
            opacity_pct: default_opacity_pct(),
            margin_px: default_margin_px(),
            scale_pct: default_scale_pct(),
            corner: WatermarkCorner::default(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Export,
    Imaging,
    Metadata,
    Watermark,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Export => "export",
            ConfigSection::Imaging => "imaging",
            ConfigSection::Metadata => "metadata",
            ConfigSection::Watermark => "watermark",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[imaging]"));
        assert!(toml.contains("jpeg_quality"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.paths.data_root, settings.paths.data_root);
        assert_eq!(parsed.imaging.max_edge, settings.imaging.max_edge);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[paths]\ndata_root = \"custom_batches\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        // Custom value preserved
        assert_eq!(parsed.paths.data_root, "custom_batches");
        // Defaults applied for missing
        assert_eq!(parsed.logging.compact, true);
        assert_eq!(parsed.imaging.jpeg_quality, 90);
        assert_eq!(parsed.watermark.corner, WatermarkCorner::BottomRight);
    }

    #[test]
    fn delimiter_byte_falls_back_to_comma() {
        let mut export = ExportSettings::default();
        assert_eq!(export.delimiter_byte(), b',');
        export.delimiter = ";".to_string();
        assert_eq!(export.delimiter_byte(), b';');
        export.delimiter = String::new();
        assert_eq!(export.delimiter_byte(), b',');
    }
}
