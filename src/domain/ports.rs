use super::transaction::{LedgerEntry, TransactionRecord};
use crate::error::Result;
use async_trait::async_trait;

/// Append-only log of authorization decisions.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Appends an entry and returns it with its assigned sequence id.
    /// Ids start at 1 and increase strictly.
    async fn insert(&self, entry: LedgerEntry) -> Result<TransactionRecord>;

    /// At most `n` records, most recent first.
    async fn query_last(&self, n: usize) -> Result<Vec<TransactionRecord>>;
}

pub type LedgerBox = Box<dyn TransactionLedger>;
