#![forbid(unsafe_code)]

//! Dispatch history storage.

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::types::DispatchRecord;
use crate::Result;

/// Keeps the dispatch history shown on the admin surface. Appending is
/// best-effort from the dispatcher's point of view; a log failure never
/// fails the dispatch itself.
#[async_trait]
pub trait DispatchLog: Send + Sync {
    async fn record(&self, record: DispatchRecord) -> Result<DispatchRecord>;
    async fn get(&self, id: &Uuid) -> Result<Option<DispatchRecord>>;
    /// Most recent records first, at most `limit`.
    async fn recent(&self, limit: usize) -> Result<Vec<DispatchRecord>>;
}

/// Bounded in-memory history. Oldest records are dropped once the cap is
/// reached.
pub struct InMemoryDispatchLog {
    records: RwLock<Vec<DispatchRecord>>,
    capacity: usize,
}

const DEFAULT_CAPACITY: usize = 1024;

impl InMemoryDispatchLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for InMemoryDispatchLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DispatchLog for InMemoryDispatchLog {
    async fn record(&self, record: DispatchRecord) -> Result<DispatchRecord> {
        let mut records = self.records.write();
        if records.len() >= self.capacity {
            let excess = records.len() + 1 - self.capacity;
            records.drain(..excess);
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<DispatchRecord>> {
        let records = self.records.read();
        Ok(records.iter().find(|r| &r.id == id).cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<DispatchRecord>> {
        let records = self.records.read();
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
