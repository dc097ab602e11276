//! Record store: the persistent mapping from item id to its current record.
//!
//! The orchestrator and service only speak to the [`RecordStore`] trait.
//! Implementations guarantee concurrency-safe, per-item atomic updates:
//! `update_terminal` writes every terminal field in one all-or-nothing
//! operation, so a reader never observes partially populated terminal state.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::types::{ImageRecord, TerminalOutcome};

/// Persistent store of image item records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record. The record's status may be `processing` (normal
    /// upload path) or already terminal `failed` (upload-time rejection).
    async fn insert(&self, record: ImageRecord) -> StoreResult<()>;

    /// Atomically write all terminal fields for one item.
    ///
    /// Overwrites any previous terminal state rather than appending, so a
    /// re-run against the same id is safe.
    async fn update_terminal(
        &self,
        id: &str,
        outcome: TerminalOutcome,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Fetch one record by id.
    async fn get(&self, id: &str) -> StoreResult<Option<ImageRecord>>;

    /// All records, newest created first.
    async fn list_all(&self) -> StoreResult<Vec<ImageRecord>>;
}
