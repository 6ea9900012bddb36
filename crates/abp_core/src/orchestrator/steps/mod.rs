//! Numbered pipeline steps.
//!
//! One file per step. Each step reads from the most recent earlier
//! step's output directory (falling back to the batch source dir) and
//! writes into its own `output/stepN` directory, so re-running a step
//! overwrites its own artifacts without touching other steps.

mod bit_depth;
mod convert;
mod csv_export;
mod encoding;
mod metadata;
mod resize;
mod watermark;
mod worksheet;

pub use bit_depth::BitDepthStep;
pub use convert::ConvertStep;
pub use csv_export::CsvExportStep;
pub use encoding::EncodingStep;
pub use metadata::MetadataStep;
pub use resize::ResizeStep;
pub use watermark::WatermarkStep;
pub use worksheet::WorksheetStep;

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::imaging::{is_image_file, save_jpeg};
use crate::models::WorksheetRow;
use crate::orchestrator::errors::StepError;
use crate::orchestrator::types::Context;

/// Name of the worksheet file written by step 1.
pub const WORKSHEET_FILE: &str = "worksheet.json";

/// Name of the CSV file written by steps 2 and 3.
pub const CSV_FILE: &str = "metadata.csv";

/// List image files in a directory, sorted by filename.
pub(crate) fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>, StepError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| StepError::io_error(format!("read {}", dir.display()), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StepError::io_error("read directory entry", e))?;
        let path = entry.path();
        if path.is_file() && is_image_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Whether a directory exists and contains at least one image file.
pub(crate) fn dir_has_images(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|e| {
                let path = e.path();
                path.is_file() && is_image_file(&path)
            })
        })
        .unwrap_or(false)
}

/// Pick the input directory for a derivative step.
///
/// Returns the highest-numbered earlier step output that contains
/// images, falling back to the batch source directory. Steps whose
/// output is non-image (worksheet, CSV) are passed over naturally.
pub(crate) fn input_dir_for(ctx: &Context, step: u32) -> PathBuf {
    for n in (1..step).rev() {
        let dir = ctx.paths.step_dir(n);
        if dir_has_images(&dir) {
            return dir;
        }
    }
    ctx.paths.source_dir()
}

/// Path to the worksheet file produced by step 1.
pub(crate) fn worksheet_path(ctx: &Context) -> PathBuf {
    ctx.paths.step_dir(1).join(WORKSHEET_FILE)
}

/// Load worksheet rows from a JSON file.
pub(crate) fn load_worksheet(path: &Path) -> Result<Vec<WorksheetRow>, StepError> {
    let content = fs::read_to_string(path)
        .map_err(|e| StepError::io_error(format!("read {}", path.display()), e))?;
    serde_json::from_str(&content).map_err(|e| StepError::json_error("parse worksheet", e))
}

/// Create (if needed) and return a step's output directory.
pub(crate) fn ensure_step_dir(ctx: &Context, step: u32) -> Result<PathBuf, StepError> {
    let dir = ctx.paths.step_dir(step);
    fs::create_dir_all(&dir)
        .map_err(|e| StepError::io_error(format!("create {}", dir.display()), e))?;
    Ok(dir)
}

/// Write a file atomically (temp file, then rename).
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StepError> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes)
        .map_err(|e| StepError::io_error(format!("write {}", temp_path.display()), e))?;
    fs::rename(&temp_path, path)
        .map_err(|e| StepError::io_error(format!("rename to {}", path.display()), e))
}

/// Save a derivative image, honoring the target extension.
///
/// JPEG targets go through the quality-aware encoder (flattening any
/// alpha channel); everything else uses the extension-based encoder.
pub(crate) fn save_derivative(
    img: &DynamicImage,
    path: &Path,
    jpeg_quality: u8,
) -> Result<(), StepError> {
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false);

    let result = if is_jpeg {
        save_jpeg(img, path, jpeg_quality)
    } else {
        img.save(path)
    };
    result.map_err(|e| StepError::image_error(format!("save {}", path.display()), e))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use image::{DynamicImage, ImageBuffer, Luma, Rgb};
    use tempfile::TempDir;

    use crate::config::{ProjectConfig, Settings};
    use crate::logging::{BatchLogger, LogConfig};
    use crate::models::BatchSpec;
    use crate::orchestrator::types::Context;
    use crate::project::BatchPaths;

    /// Build a context over a fresh batch tree rooted inside `dir`.
    pub(crate) fn context(dir: &TempDir) -> Context {
        context_with_settings(dir, Settings::default())
    }

    pub(crate) fn context_with_settings(dir: &TempDir, settings: Settings) -> Context {
        let root = dir.path().join("batch_001");
        let paths = BatchPaths::new(&root);
        paths.ensure_layout().unwrap();

        let config = Arc::new(ProjectConfig::load_or_create(paths.project_file()).unwrap());
        let logger = Arc::new(
            BatchLogger::new("batch_001", paths.logs_dir(), LogConfig::default(), None).unwrap(),
        );

        Context::new(
            BatchSpec::new("batch_001", &root),
            settings,
            paths,
            config,
            logger,
        )
    }

    /// Write a small 8-bit RGB image into `dir`.
    pub(crate) fn write_rgb_image(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(w, h, Rgb([120u8, 130, 140])));
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    /// Write a 16-bit grayscale PNG into `dir`.
    pub(crate) fn write_sixteen_bit_image(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let img = DynamicImage::ImageLuma16(ImageBuffer::from_pixel(w, h, Luma([40_000u16])));
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }
}
