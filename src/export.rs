// SKYLINE Batch Export
// Copyright (c) 2026 Xing_The_Creator | SKYLINE
//
// Bundles selected artworks into a ZIP archive, each image re-encoded at
// the target resolution in the requested format.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::AppConfig;
use crate::imaging::{self, ExportFormat};

/// File name prefix shared by every export archive; the sweeper keys on it.
pub const ARCHIVE_PREFIX: &str = "toledo_art_export_";

/// Outcome of one export run.
#[derive(Debug, Clone)]
pub struct ExportArchive {
    pub path: PathBuf,
    pub entries: usize,
    pub skipped: usize,
}

/// `toledo_art_export_<YYYYmmdd_HHMMSS>.zip`
pub fn archive_filename() -> String {
    format!(
        "{}{}.zip",
        ARCHIVE_PREFIX,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

pub fn is_archive_name(name: &str) -> bool {
    name.starts_with(ARCHIVE_PREFIX) && name.ends_with(".zip")
}

/// Write the archive into `config.output_dir`.
///
/// `image_urls` are the `/static/...` URLs handed out by `/generate` and
/// `/history`. Ones that fail validation or do not exist are skipped,
/// matching the gallery's habit of sending stale selections. Any other
/// failure removes the partially written archive.
pub fn export_batch(
    image_urls: &[String],
    format: ExportFormat,
    config: &AppConfig,
) -> Result<ExportArchive> {
    let output_dir = &config.output_dir;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir {:?}", output_dir))?;

    let archive_path = output_dir.join(archive_filename());
    let file = File::create(&archive_path)
        .with_context(|| format!("Failed to create archive {:?}", archive_path))?;

    let (entries, skipped) = match write_entries(file, image_urls, format, config) {
        Ok(counts) => counts,
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(&archive_path) {
                warn!("[EXPORT] Could not remove partial archive {:?}: {}", archive_path, rm);
            }
            return Err(e);
        }
    };

    info!(
        "[EXPORT] 📦 {:?}: {} images ({} skipped)",
        archive_path, entries, skipped
    );
    Ok(ExportArchive {
        path: archive_path,
        entries,
        skipped,
    })
}

fn write_entries(
    file: File,
    image_urls: &[String],
    format: ExportFormat,
    config: &AppConfig,
) -> Result<(usize, usize)> {
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0;
    let mut skipped = 0;

    for url in image_urls {
        let path = match config.resolve_public_url(url) {
            Ok(p) if p.is_file() => p,
            Ok(p) => {
                warn!("[EXPORT] Skipping missing image {:?}", p);
                skipped += 1;
                continue;
            }
            Err(e) => {
                warn!("[EXPORT] {}", e);
                skipped += 1;
                continue;
            }
        };

        let bytes = imaging::encode_for_export(&path, format)?;
        let entry_name = entry_name(&path, format, entries);

        zip.start_file(entry_name.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", entry_name))?;
        zip.write_all(&bytes)?;
        entries += 1;
    }

    zip.finish().context("Failed to finalize archive")?;
    Ok((entries, skipped))
}

fn entry_name(path: &Path, format: ExportFormat, index: usize) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("image_{}", index));
    format!("{}.{}", stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            database_url: None,
            static_dir: dir.to_path_buf(),
            output_dir: dir.join("generated"),
            ..AppConfig::default()
        }
    }

    fn archives_in(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| is_archive_name(name))
            .collect()
    }

    #[test]
    fn test_archive_filename_shape() {
        let name = archive_filename();
        assert!(name.starts_with("toledo_art_export_"));
        assert!(is_archive_name(&name));
        assert!(!is_archive_name("generated_20260101_000000_1234.png"));
    }

    #[test]
    fn test_export_skips_unsafe_and_missing_urls() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.output_dir).unwrap();
        let src = config.output_dir.join("tower.png");
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 10, Rgba([9, 9, 9, 255])))
            .save(&src)
            .unwrap();

        let urls = vec![
            config.public_url(&src).unwrap(),
            "/static/generated/missing.png".to_string(),
            "/static/../../etc/passwd".to_string(),
            src.to_string_lossy().into_owned(),
        ];
        let archive = export_batch(&urls, ExportFormat::Png, &config).unwrap();
        assert_eq!(archive.entries, 1);
        assert_eq!(archive.skipped, 3);

        let zip = zip::ZipArchive::new(File::open(&archive.path).unwrap()).unwrap();
        assert_eq!(zip.file_names().collect::<Vec<_>>(), vec!["tower.png"]);
    }

    #[test]
    fn test_failed_export_leaves_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.output_dir).unwrap();
        let broken = config.output_dir.join("broken.png");
        std::fs::write(&broken, b"not an image").unwrap();

        let urls = vec![config.public_url(&broken).unwrap()];
        assert!(export_batch(&urls, ExportFormat::Jpg, &config).is_err());
        assert!(archives_in(&config.output_dir).is_empty());
    }
}
