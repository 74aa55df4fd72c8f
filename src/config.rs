// SKYLINE Configuration
// Copyright (c) 2026 Xing_The_Creator | SKYLINE

use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Side length of every stored and exported artwork, in pixels.
pub const TARGET_SIZE: u32 = 1200;

/// URL prefix under which `static_dir` is mounted.
pub const STATIC_PREFIX: &str = "/static";

/// Runtime settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `sqlite://path`, a bare file path, or `None` for in-memory only.
    pub database_url: Option<String>,
    /// Served at `/static`; `index.html` here is the landing page.
    pub static_dir: PathBuf,
    /// Where generated artworks and export archives are written. Must sit
    /// inside `static_dir` so everything written is also served.
    pub output_dir: PathBuf,
    pub retention: Duration,
    pub cleanup_interval: Duration,
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            database_url: Some("sqlite://art.db".to_string()),
            static_dir: PathBuf::from("static"),
            output_dir: PathBuf::from("static/generated"),
            retention: Duration::from_secs(24 * 60 * 60),
            cleanup_interval: Duration::from_secs(6 * 60 * 60),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) if url.trim().is_empty() || url == "memory" => None,
            Ok(url) => Some(url),
            Err(_) => defaults.database_url.clone(),
        };

        let static_dir = std::env::var("SKYLINE_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);
        // A moved static dir carries the default output location with it
        let output_dir = std::env::var("SKYLINE_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| static_dir.join("generated"));

        let config = Self {
            port: env_parse("SKYLINE_PORT").unwrap_or(defaults.port),
            database_url,
            static_dir,
            output_dir,
            retention: env_parse::<u64>("SKYLINE_RETENTION_HOURS")
                .map(|h| Duration::from_secs(h * 60 * 60))
                .unwrap_or(defaults.retention),
            cleanup_interval: env_parse::<u64>("SKYLINE_CLEANUP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            max_body_bytes: env_parse("SKYLINE_MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
        };
        config.validate()?;
        Ok(config)
    }

    /// `output_dir` must be `static_dir` or below it, without `..` steps.
    pub fn validate(&self) -> Result<()> {
        match self.output_dir.strip_prefix(&self.static_dir) {
            Ok(rest) if is_plain_relative(rest) => Ok(()),
            _ => bail!(
                "Output dir {:?} must be inside static dir {:?}",
                self.output_dir,
                self.static_dir
            ),
        }
    }

    /// Public URL of a file written below `static_dir`.
    pub fn public_url(&self, path: &Path) -> Result<String> {
        let rest = match path.strip_prefix(&self.static_dir) {
            Ok(rest) if is_plain_relative(rest) => rest,
            _ => bail!("{:?} is not under the static dir {:?}", path, self.static_dir),
        };
        let segments: Vec<String> = rest
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Ok(format!("{}/{}", STATIC_PREFIX, segments.join("/")))
    }

    /// Map a `/static/...` URL back to its file below `static_dir`,
    /// refusing anything that would climb out of it.
    pub fn resolve_public_url(&self, url: &str) -> Result<PathBuf, String> {
        let rest = url
            .strip_prefix(STATIC_PREFIX)
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(|| format!("Access denied: '{}' is not a served file", url))?;

        let rest = Path::new(rest);
        if rest.as_os_str().is_empty() || !is_plain_relative(rest) {
            return Err(format!("Access denied: invalid path '{}'", url));
        }
        Ok(self.static_dir.join(rest))
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("[CONFIG] Ignoring unparsable {}={:?}", key, raw);
            None
        }
    }
}
