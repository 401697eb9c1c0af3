use crate::domain::ports::TransactionLedger;
use crate::domain::transaction::{LedgerEntry, TransactionRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory ledger.
///
/// Records live in insertion order inside `Arc<RwLock<Vec<TransactionRecord>>>`;
/// clones share the same log, which lets a test keep a handle while the
/// server owns another. Nothing survives the process.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    records: Arc<RwLock<Vec<TransactionRecord>>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionLedger for InMemoryLedger {
    async fn insert(&self, entry: LedgerEntry) -> Result<TransactionRecord> {
        let mut records = self.records.write().await;
        let id = records.len() as u64 + 1;
        let record = entry.into_record(id);
        records.push(record.clone());
        Ok(record)
    }

    async fn query_last(&self, n: usize) -> Result<Vec<TransactionRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().rev().take(n).cloned().collect())
    }
}
