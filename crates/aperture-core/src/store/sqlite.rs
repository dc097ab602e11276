//! SQLite-backed record store.
//!
//! One `images` table keyed by id. The EXIF map is stored as a JSON text
//! column and timestamps as RFC 3339 text. Terminal state is written by a
//! single UPDATE statement, which is what makes `update_terminal`
//! all-or-nothing for readers.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::Mutex;

use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{ImageMetadata, ImageRecord, ImageStatus, TerminalOutcome};

/// Record store backed by a SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at the given path, with WAL mode.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Malformed {
                id: path.display().to_string(),
                message: format!("cannot create database directory: {e}"),
            })?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS images (
                id          TEXT PRIMARY KEY,
                original_name TEXT NOT NULL,
                status      TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                processed_at TEXT,
                width       INTEGER,
                height      INTEGER,
                format      TEXT,
                size_bytes  INTEGER,
                exif        TEXT,
                caption     TEXT,
                processing_time_seconds REAL,
                error       TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_images_created ON images(created_at);
            ",
        )?;
        Ok(())
    }
}

fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(id: &str, s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::Malformed {
            id: id.to_string(),
            message: format!("bad timestamp {s:?}: {e}"),
        })
}

/// Raw column values of one row, before interpretation.
struct RawRow {
    id: String,
    original_name: String,
    status: String,
    created_at: String,
    processed_at: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    format: Option<String>,
    size_bytes: Option<i64>,
    exif: Option<String>,
    caption: Option<String>,
    processing_time_seconds: Option<f64>,
    error: Option<String>,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            original_name: row.get(1)?,
            status: row.get(2)?,
            created_at: row.get(3)?,
            processed_at: row.get(4)?,
            width: row.get(5)?,
            height: row.get(6)?,
            format: row.get(7)?,
            size_bytes: row.get(8)?,
            exif: row.get(9)?,
            caption: row.get(10)?,
            processing_time_seconds: row.get(11)?,
            error: row.get(12)?,
        })
    }

    fn into_record(self) -> StoreResult<ImageRecord> {
        let status = ImageStatus::parse(&self.status).ok_or_else(|| StoreError::Malformed {
            id: self.id.clone(),
            message: format!("unknown status {:?}", self.status),
        })?;

        let metadata = if status == ImageStatus::Success {
            let (Some(width), Some(height), Some(format), Some(size_bytes)) =
                (self.width, self.height, self.format, self.size_bytes)
            else {
                return Err(StoreError::Malformed {
                    id: self.id,
                    message: "success record missing metadata columns".to_string(),
                });
            };
            let exif: BTreeMap<String, String> = match self.exif {
                Some(json) => serde_json::from_str(&json)?,
                None => BTreeMap::new(),
            };
            Some(ImageMetadata {
                width: width as u32,
                height: height as u32,
                format,
                size_bytes: size_bytes as u64,
                exif,
                caption: self.caption,
            })
        } else {
            None
        };

        let created_at = parse_ts(&self.id, &self.created_at)?;
        let processed_at = self
            .processed_at
            .as_deref()
            .map(|s| parse_ts(&self.id, s))
            .transpose()?;

        Ok(ImageRecord {
            id: self.id,
            original_name: self.original_name,
            status,
            created_at,
            processed_at,
            metadata,
            error: self.error,
            processing_time_seconds: self.processing_time_seconds,
        })
    }
}

const SELECT_COLUMNS: &str = "id, original_name, status, created_at, processed_at, \
     width, height, format, size_bytes, exif, caption, processing_time_seconds, error";

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert(&self, record: ImageRecord) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO images (id, original_name, status, created_at, processed_at, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.original_name,
                record.status.as_str(),
                ts(&record.created_at),
                record.processed_at.as_ref().map(ts),
                record.error,
            ],
        )?;
        Ok(())
    }

    async fn update_terminal(
        &self,
        id: &str,
        outcome: TerminalOutcome,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let changed = match outcome {
            TerminalOutcome::Success {
                metadata,
                processing_time_seconds,
            } => {
                let exif = if metadata.exif.is_empty() {
                    None
                } else {
                    Some(serde_json::to_string(&metadata.exif)?)
                };
                conn.execute(
                    "UPDATE images SET
                        status = 'success',
                        processed_at = ?1,
                        width = ?2, height = ?3, format = ?4, size_bytes = ?5,
                        exif = ?6, caption = ?7,
                        processing_time_seconds = ?8, error = NULL
                     WHERE id = ?9",
                    params![
                        ts(&processed_at),
                        metadata.width,
                        metadata.height,
                        metadata.format,
                        metadata.size_bytes as i64,
                        exif,
                        metadata.caption,
                        processing_time_seconds,
                        id,
                    ],
                )?
            }
            TerminalOutcome::Failed { error } => conn.execute(
                "UPDATE images SET
                    status = 'failed',
                    processed_at = ?1,
                    width = NULL, height = NULL, format = NULL, size_bytes = NULL,
                    exif = NULL, caption = NULL,
                    processing_time_seconds = NULL, error = ?2
                 WHERE id = ?3",
                params![ts(&processed_at), error, id],
            )?,
        };

        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<ImageRecord>> {
        let conn = self.conn.lock().await;
        let raw = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM images WHERE id = ?1"),
                params![id],
                RawRow::from_row,
            )
            .optional()?;
        raw.map(RawRow::into_record).transpose()
    }

    async fn list_all(&self) -> StoreResult<Vec<ImageRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM images ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map([], RawRow::from_row)?
            .collect::<rusqlite::Result<Vec<RawRow>>>()?;
        rows.into_iter().map(RawRow::into_record).collect()
    }
}
