// SKYLINE Artwork Store
// Copyright (c) 2026 Xing_The_Creator | SKYLINE
//
// Persistence for generated artworks. The store is picked once at startup
// and handed to the server as an explicit dependency: SQLite when the
// database opens, an in-memory ring otherwise.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ToSql};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::params::StyleParameters;

/// Entries kept by the in-memory fallback before the oldest is dropped.
pub const MEMORY_CAPACITY: usize = 100;

/// One persisted artwork, as listed by `/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtworkRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub image_path: String,
    pub style_params: StyleParameters,
}

pub trait ArtworkStore: Send + Sync {
    /// Short backend label for logs.
    fn backend(&self) -> &'static str;

    fn save(&self, image_path: &str, params: &StyleParameters) -> Result<ArtworkRecord>;

    /// Most recent first.
    fn list_recent(&self, limit: usize) -> Result<Vec<ArtworkRecord>>;

    /// Remove and return every record created before `cutoff`.
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<ArtworkRecord>>;
}

pub type SharedStore = Arc<dyn ArtworkStore>;

/// Open the configured database, falling back to memory if it is unusable.
pub fn open_store(config: &AppConfig) -> SharedStore {
    let Some(url) = config.database_url.as_deref() else {
        info!("[STORE] No database configured, using in-memory storage");
        return Arc::new(MemoryStore::new());
    };

    match SqliteStore::open(sqlite_path(url)) {
        Ok(store) => {
            info!("[STORE] Database initialized successfully ({})", url);
            Arc::new(store)
        }
        Err(e) => {
            warn!("[STORE] Database initialization failed: {:#}. Falling back to memory.", e);
            Arc::new(MemoryStore::new())
        }
    }
}

fn sqlite_path(url: &str) -> &str {
    url.strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .unwrap_or(url)
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite
// ─────────────────────────────────────────────────────────────────────────────

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {:?}", path))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS artwork_generation (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                image_path TEXT NOT NULL,
                style_params TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_artwork_created_at
                ON artwork_generation (created_at);",
        )
        .context("Failed to create artwork table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Database connection lock poisoned"))
    }
}

fn query_records(conn: &Connection, sql: &str, arg: &dyn ToSql) -> Result<Vec<ArtworkRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![arg], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, created_at, image_path, style_params) = row?;
        records.push(ArtworkRecord {
            id,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .with_context(|| format!("Bad timestamp on artwork {}", id))?
                .with_timezone(&Utc),
            image_path,
            style_params: serde_json::from_str(&style_params)
                .with_context(|| format!("Bad style params on artwork {}", id))?,
        });
    }
    Ok(records)
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl ArtworkStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn save(&self, image_path: &str, params: &StyleParameters) -> Result<ArtworkRecord> {
        let created_at = Utc::now();
        let json = serde_json::to_string(params)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO artwork_generation (created_at, image_path, style_params)
             VALUES (?1, ?2, ?3)",
            params![timestamp(&created_at), image_path, json],
        )
        .context("Failed to insert artwork")?;

        Ok(ArtworkRecord {
            id: conn.last_insert_rowid(),
            created_at,
            image_path: image_path.to_string(),
            style_params: params.clone(),
        })
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<ArtworkRecord>> {
        let conn = self.lock()?;
        query_records(
            &conn,
            "SELECT id, created_at, image_path, style_params FROM artwork_generation
             ORDER BY created_at DESC, id DESC LIMIT ?1",
            &(limit.min(i64::MAX as usize) as i64),
        )
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<ArtworkRecord>> {
        let cutoff = timestamp(&cutoff);
        let mut conn = self.lock()?;
        // Report exactly the rows that get deleted
        let tx = conn.transaction().context("Failed to begin purge")?;
        let expired = query_records(
            &tx,
            "SELECT id, created_at, image_path, style_params FROM artwork_generation
             WHERE created_at < ?1",
            &cutoff,
        )?;
        tx.execute(
            "DELETE FROM artwork_generation WHERE created_at < ?1",
            params![cutoff],
        )
        .context("Failed to purge artworks")?;
        tx.commit().context("Failed to commit purge")?;
        Ok(expired)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory fallback
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryInner {
    next_id: i64,
    records: VecDeque<ArtworkRecord>,
}

/// Bounded ring of the latest artworks. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))
    }
}

impl ArtworkStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn save(&self, image_path: &str, params: &StyleParameters) -> Result<ArtworkRecord> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let record = ArtworkRecord {
            id: inner.next_id,
            created_at: Utc::now(),
            image_path: image_path.to_string(),
            style_params: params.clone(),
        };
        inner.records.push_back(record.clone());
        while inner.records.len() > MEMORY_CAPACITY {
            inner.records.pop_front();
        }
        Ok(record)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<ArtworkRecord>> {
        let inner = self.lock()?;
        Ok(inner.records.iter().rev().take(limit).cloned().collect())
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<ArtworkRecord>> {
        let mut inner = self.lock()?;
        let (expired, kept): (Vec<_>, Vec<_>) = inner
            .records
            .drain(..)
            .partition(|r| r.created_at < cutoff);
        inner.records = kept.into();
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ColorTone;
    use chrono::Duration;

    fn sample(tone: ColorTone) -> StyleParameters {
        StyleParameters {
            intensity: Some(0.4),
            color_tone: Some(tone),
            mud_hens: Some(true),
            ..Default::default()
        }
    }

    fn exercise(store: &dyn ArtworkStore) {
        let first = store.save("static/generated/a.png", &sample(ColorTone::Storm)).unwrap();
        let second = store.save("static/generated/b.png", &sample(ColorTone::Sunset)).unwrap();
        assert_ne!(first.id, second.id);

        let recent = store.list_recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].image_path, "static/generated/b.png");
        assert_eq!(recent[0].style_params, sample(ColorTone::Sunset));
        assert_eq!(store.list_recent(1).unwrap().len(), 1);

        let none = store.purge_older_than(Utc::now() - Duration::hours(1)).unwrap();
        assert!(none.is_empty());

        let all = store.purge_older_than(Utc::now() + Duration::seconds(1)).unwrap();
        assert_eq!(all.len(), 2);
        assert!(store.list_recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_roundtrip() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        exercise(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_purge_accounts_for_every_row_under_concurrent_saves() {
        let store = std::sync::Arc::new(SqliteStore::open_in_memory().unwrap());
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    store
                        .save(&format!("static/generated/{}.png", i), &StyleParameters::default())
                        .unwrap();
                }
            })
        };

        // A future cutoff covers every row, including ones saved mid-purge
        let mut purged = 0;
        while !writer.is_finished() {
            purged += store
                .purge_older_than(Utc::now() + Duration::hours(1))
                .unwrap()
                .len();
        }
        writer.join().unwrap();

        let remaining = store.list_recent(usize::MAX).unwrap().len();
        assert_eq!(purged + remaining, 200);
    }

    #[test]
    fn test_memory_store_caps_entries() {
        let store = MemoryStore::new();
        for i in 0..(MEMORY_CAPACITY + 5) {
            store
                .save(&format!("static/generated/{}.png", i), &StyleParameters::default())
                .unwrap();
        }
        let all = store.list_recent(usize::MAX).unwrap();
        assert_eq!(all.len(), MEMORY_CAPACITY);
        assert_eq!(all[0].image_path, format!("static/generated/{}.png", MEMORY_CAPACITY + 4));
        assert_eq!(all.last().unwrap().image_path, "static/generated/5.png");
    }

    #[test]
    fn test_sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("art.db");

        SqliteStore::open(&db)
            .unwrap()
            .save("static/generated/kept.png", &sample(ColorTone::Riverfront))
            .unwrap();

        let reopened = SqliteStore::open(&db).unwrap();
        let recent = reopened.list_recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].style_params.color_tone, Some(ColorTone::Riverfront));
    }

    #[test]
    fn test_open_store_falls_back_to_memory() {
        let config = AppConfig {
            database_url: Some("sqlite:///nonexistent-dir/deeper/art.db".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(open_store(&config).backend(), "memory");

        let config = AppConfig {
            database_url: None,
            ..AppConfig::default()
        };
        assert_eq!(open_store(&config).backend(), "memory");
    }

    #[test]
    fn test_sqlite_path_forms() {
        assert_eq!(sqlite_path("sqlite:///art.db"), "art.db");
        assert_eq!(sqlite_path("sqlite://data/art.db"), "data/art.db");
        assert_eq!(sqlite_path("art.db"), "art.db");
    }
}
