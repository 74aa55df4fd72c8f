// SKYLINE Cleanup Sweeper
// Copyright (c) 2026 Xing_The_Creator | SKYLINE
//
// Background task that expires old artworks (their store entries and the
// image files they point at) and stale export archives.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

use crate::export;
use crate::store::SharedStore;

pub struct CleanupSweeper {
    store: SharedStore,
    archive_dir: PathBuf,
    retention: Duration,
    interval: Duration,
    is_running: Arc<AtomicBool>,
}

impl CleanupSweeper {
    pub fn new(
        store: SharedStore,
        archive_dir: PathBuf,
        retention: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            archive_dir,
            retention,
            interval,
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Purge expired entries and delete their files, then drop export
    /// archives older than the retention window.
    /// Returns `(files_removed, entries_removed)`; archives count as files.
    pub fn sweep_once(&self) -> Result<(usize, usize)> {
        let retention = chrono::Duration::from_std(self.retention)?;
        let expired = self.store.purge_older_than(Utc::now() - retention)?;

        let mut files = 0;
        for record in &expired {
            if remove_quietly(Path::new(&record.image_path)) {
                files += 1;
            }
        }
        files += self.sweep_archives()?;
        Ok((files, expired.len()))
    }

    fn sweep_archives(&self) -> Result<usize> {
        let entries = match std::fs::read_dir(&self.archive_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to list {:?}", self.archive_dir))
            }
        };
        let cutoff = SystemTime::now()
            .checked_sub(self.retention)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            if !export::is_archive_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) => {
                    warn!("[CLEANUP] No mtime for {:?}: {}", entry.path(), e);
                    continue;
                }
            };
            if modified < cutoff && remove_quietly(&entry.path()) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Spawn the periodic sweep loop. The first sweep runs immediately.
    /// Each sweep does blocking store and file I/O, so it runs on the
    /// blocking pool.
    pub fn start(self: &Arc<Self>) {
        if self.is_running.swap(true, Ordering::Relaxed) {
            return;
        }
        let sweeper = Arc::clone(self);

        tokio::spawn(async move {
            info!(
                "[CLEANUP] Sweeper started (interval: {:?}, retention: {:?}, backend: {})",
                sweeper.interval,
                sweeper.retention,
                sweeper.store.backend()
            );

            while sweeper.is_running() {
                let task = Arc::clone(&sweeper);
                match tokio::task::spawn_blocking(move || task.sweep_once()).await {
                    Ok(Ok((0, 0))) => {}
                    Ok(Ok((files, entries))) => info!(
                        "[CLEANUP] 🧹 Removed {} files and {} entries",
                        files, entries
                    ),
                    Ok(Err(e)) => error!("[CLEANUP] Sweep failed: {:#}", e),
                    Err(e) => error!("[CLEANUP] Sweep task panicked: {}", e),
                }
                tokio::time::sleep(sweeper.interval).await;
            }

            info!("[CLEANUP] Sweeper stopped.");
        });
    }

    pub fn stop(&self) {
        self.is_running.store(false, Ordering::Relaxed);
    }
}

/// True when the file was deleted; a file that is already gone is fine.
fn remove_quietly(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("[CLEANUP] {:?} already gone", path);
            false
        }
        Err(e) => {
            warn!("[CLEANUP] Could not remove {:?}: {}", path, e);
            false
        }
    }
}
