//! SQLite-backed persistence for scan results.
//!
//! Results are stored keyed by scan-job id, one row per scan holding the
//! serialized result alongside the metadata a listing needs. The default
//! store lives at `~/.metascan/scans.db`.
//!
//! # Schema
//!
//! ```text
//! scans(job_id PK, source_type, object_count, result_json, created_at)
//! meta(key PK, value)                      -- store format version
//! ```
//!
//! No TTL; entries persist until deleted. A format-version mismatch clears
//! the store on open.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

use crate::metadata::ScanResult;

/// Current store format version. Bump this when the row format changes.
const STORE_VERSION: i32 = 1;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine a home directory for the store")]
    NoStoreDir,

    #[error("no stored scan with job id {0}")]
    MissingJob(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One stored scan's listing metadata (the result itself stays in the row).
#[derive(Debug, Clone, Serialize)]
pub struct StoredScan {
    pub job_id: String,
    pub source_type: String,
    pub object_count: usize,
    pub created_at: i64,
}

/// SQLite-backed scan-result store.
pub struct ScanStore {
    conn: Connection,
}

impl ScanStore {
    /// Open or create a store at the given path, creating parent
    /// directories on demand.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Open the store at its default path, `~/.metascan/scans.db`.
    pub fn open_default() -> StoreResult<Self> {
        Self::open(Self::default_path()?)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// The default store path.
    pub fn default_path() -> StoreResult<PathBuf> {
        let base = dirs::home_dir().ok_or(StoreError::NoStoreDir)?;
        Ok(base.join(".metascan").join("scans.db"))
    }

    /// Initialize the schema and check the format version.
    fn init(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS scans (
                job_id TEXT PRIMARY KEY,
                source_type TEXT NOT NULL,
                object_count INTEGER NOT NULL,
                result_json TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let stored_version: Option<i32> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                let s: String = row.get(0)?;
                Ok(s.parse().unwrap_or(0))
            })
            .optional()?;

        match stored_version {
            Some(v) if v == STORE_VERSION => {}
            Some(_) => {
                // Format changed; stored rows are unreadable, drop them.
                self.conn.execute("DELETE FROM scans", [])?;
                self.set_version()?;
            }
            None => {
                self.set_version()?;
            }
        }

        Ok(())
    }

    fn set_version(&self) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?)",
            params![STORE_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Store a result under a job id, replacing any previous scan with the
    /// same id.
    pub fn put(&self, job_id: &str, result: &ScanResult) -> StoreResult<()> {
        let json = serde_json::to_string(result)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO scans
                 (job_id, source_type, object_count, result_json, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                job_id,
                result.source_type().as_str(),
                result.object_count() as i64,
                json,
                now(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a stored result.
    pub fn get(&self, job_id: &str) -> StoreResult<Option<ScanResult>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT result_json FROM scans WHERE job_id = ?",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    /// List stored scans, newest first.
    pub fn list(&self) -> StoreResult<Vec<StoredScan>> {
        let mut stmt = self.conn.prepare(
            "SELECT job_id, source_type, object_count, created_at
             FROM scans ORDER BY created_at DESC, rowid DESC",
        )?;

        let scans = stmt
            .query_map([], |row| {
                Ok(StoredScan {
                    job_id: row.get(0)?,
                    source_type: row.get(1)?,
                    object_count: row.get::<_, i64>(2)? as usize,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(scans)
    }

    /// Delete a stored scan.
    ///
    /// Returns true if a scan was deleted.
    pub fn delete(&self, job_id: &str) -> StoreResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM scans WHERE job_id = ?", params![job_id])?;
        Ok(rows > 0)
    }

    /// Write a stored result as CSV, one row per object, header included.
    ///
    /// Returns the number of object rows written.
    pub fn export_csv<W: io::Write>(&self, job_id: &str, writer: W) -> StoreResult<usize> {
        let result = self
            .get(job_id)?
            .ok_or_else(|| StoreError::MissingJob(job_id.to_string()))?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "container",
            "name",
            "object_type",
            "types",
            "nullable",
            "primary_key",
        ])?;
        for object in result.objects() {
            csv_writer.write_record([
                object.table.as_str(),
                object.name.as_str(),
                object.object_type.as_str(),
                &object.types.join(";"),
                flag(object.nullable),
                flag(object.primary_key),
            ])?;
        }
        csv_writer.flush()?;
        Ok(result.object_count())
    }
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "",
    }
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
