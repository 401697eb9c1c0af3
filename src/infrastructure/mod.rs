//! Ledger adapters implementing [`TransactionLedger`](crate::domain::ports::TransactionLedger).

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
