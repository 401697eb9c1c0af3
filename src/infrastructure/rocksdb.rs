use crate::domain::ports::TransactionLedger;
use crate::domain::transaction::{LedgerEntry, TransactionRecord};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family holding ledger records keyed by sequence id.
pub const CF_TRANSACTIONS: &str = "transactions";

/// A persistent ledger backed by RocksDB.
///
/// Keys are big-endian `u64` ids so byte order matches insertion order and
/// reverse iteration yields the most recent records first. Values are JSON.
///
/// `Clone` shares the underlying `Arc<DB>` and the id sequence.
#[derive(Clone)]
pub struct RocksDBLedger {
    db: Arc<DB>,
    last_id: Arc<Mutex<u64>>,
}

impl RocksDBLedger {
    /// Opens or creates a ledger at the specified path.
    ///
    /// The id sequence resumes after the highest id already stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_transactions])?;

        let last_id = {
            let cf = db.cf_handle(CF_TRANSACTIONS).ok_or_else(missing_cf)?;
            match db.iterator_cf(&cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _value) = item?;
                    decode_key(&key)?
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            last_id: Arc::new(Mutex::new(last_id)),
        })
    }
}

fn missing_cf() -> GatewayError {
    GatewayError::Storage("Transactions column family not found".to_string())
}

fn decode_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| {
        GatewayError::Storage(format!("Malformed ledger key of {} bytes", key.len()))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl TransactionLedger for RocksDBLedger {
    async fn insert(&self, entry: LedgerEntry) -> Result<TransactionRecord> {
        // Holding the sequence lock across the write keeps ids and key order aligned.
        let mut last_id = self.last_id.lock().await;
        let cf = self.db.cf_handle(CF_TRANSACTIONS).ok_or_else(missing_cf)?;
        let record = entry.into_record(*last_id + 1);
        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(&cf, record.id.to_be_bytes(), value)?;
        *last_id = record.id;

        Ok(record)
    }

    async fn query_last(&self, n: usize) -> Result<Vec<TransactionRecord>> {
        let cf = self.db.cf_handle(CF_TRANSACTIONS).ok_or_else(missing_cf)?;

        let mut records = Vec::with_capacity(n.min(64));
        for item in self.db.iterator_cf(&cf, IteratorMode::End).take(n) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }

        Ok(records)
    }
}
