//! In-memory record store for tests and storeless deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{ImageRecord, TerminalOutcome};

/// Record store backed by a process-local vector in insertion order.
///
/// Updates take the write lock for the whole mutation, which gives the same
/// all-or-nothing visibility as a single SQL UPDATE.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<ImageRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: ImageRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Malformed {
                id: record.id,
                message: "duplicate id on insert".to_string(),
            });
        }
        records.push(record);
        Ok(())
    }

    async fn update_terminal(
        &self,
        id: &str,
        outcome: TerminalOutcome,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.apply_terminal(outcome, processed_at);
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<ImageRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn list_all(&self) -> StoreResult<Vec<ImageRecord>> {
        let records = self.records.read().await;
        let mut all: Vec<ImageRecord> = records.clone();
        all.reverse();
        Ok(all)
    }
}
