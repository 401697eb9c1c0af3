use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Connection closed by peer")]
    ConnectionClosed,
    #[error("Line exceeds maximum length of {max} bytes")]
    LineTooLong { max: usize },
    #[error("Line is not valid UTF-8")]
    InvalidUtf8,
    #[error("Handshake failed: {0}")]
    Handshake(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: Box<GatewayError>,
    },
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for GatewayError {
    fn from(e: rocksdb::Error) -> Self {
        GatewayError::Storage(e.into_string())
    }
}
