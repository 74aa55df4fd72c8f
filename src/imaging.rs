// SKYLINE Imaging
// Copyright (c) 2026 Xing_The_Creator | SKYLINE
//
// Canvas decode, square resize and re-encode. All functions block and are
// run on the blocking pool by the server.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use rand::Rng;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::TARGET_SIZE;

pub const JPEG_QUALITY: u8 = 95;

/// Encoding used for exported images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpg,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpg),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
        }
    }
}

/// Payload of a `data:image/png;base64,...` URL (everything after the comma).
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let (_, payload) = data_url
        .split_once(',')
        .context("Canvas data is not a data URL")?;
    STANDARD
        .decode(payload.trim())
        .context("Canvas data is not valid base64")
}

/// Resize to the square target unless it is already there.
pub fn fit_to_target(img: DynamicImage) -> DynamicImage {
    let (w, h) = img.dimensions();
    if (w, h) == (TARGET_SIZE, TARGET_SIZE) {
        return img;
    }
    debug!("[IMAGING] Resizing {}x{} -> {}x{}", w, h, TARGET_SIZE, TARGET_SIZE);
    img.resize_exact(TARGET_SIZE, TARGET_SIZE, FilterType::Lanczos3)
}

/// `generated_<YYYYmmdd_HHMMSS>_<NNNN>.png`
pub fn artwork_filename() -> String {
    format!(
        "generated_{}_{}.png",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        rand::thread_rng().gen_range(1000..=9999)
    )
}

/// Decode canvas bytes, fit them to the target size and write a PNG into
/// `output_dir`. Returns the written path.
pub fn save_canvas(bytes: &[u8], output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir {:?}", output_dir))?;

    let img = image::load_from_memory(bytes).context("Canvas data is not a readable image")?;
    let img = fit_to_target(img);

    let path = output_dir.join(artwork_filename());
    img.save_with_format(&path, ImageFormat::Png)
        .with_context(|| format!("Failed to write {:?}", path))?;

    info!("[IMAGING] Saved artwork {:?}", path);
    Ok(path)
}

/// Open `path`, fit it to the target size and encode it for export.
pub fn encode_for_export(path: &Path, format: ExportFormat) -> Result<Vec<u8>> {
    let img = image::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let img = fit_to_target(img);

    let mut buf = Vec::new();
    let encoded = match format {
        ExportFormat::Png => img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png),
        ExportFormat::Jpg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(JPEG_QUALITY)),
    };
    encoded.with_context(|| format!("Failed to encode {:?} as {}", path, format.extension()))?;

    Ok(buf)
}
