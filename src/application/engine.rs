use crate::domain::identifiers::IdentifierGenerator;
use crate::domain::ports::LedgerBox;
use crate::domain::transaction::{
    APPROVAL_LIMIT, Amount, AuthOutcome, AuthRequest, LedgerEntry, Nonce, NonceError,
};
use crate::error::GatewayError;
use crate::interfaces::wire::messages::{AUTH, FIELD_SEPARATOR, Response};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected AUTH|<amount>|<timestamp>|<nonce>")]
    Format,
    #[error("amount or timestamp is not a number")]
    Number,
}

/// Why a request could not end in a normal decision.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("parse error: {0}")]
    Parse(ParseError),
    #[error("invalid nonce: {0:?}")]
    Validation(NonceError),
    #[error("ledger insert failed: {0}")]
    Persistence(GatewayError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// The reason text sent after `DECLINED|`.
    pub fn decline_reason(&self) -> String {
        match self {
            AuthError::Parse(ParseError::Format) => "Invalid AUTH format".to_string(),
            AuthError::Parse(ParseError::Number) => {
                "Invalid amount or timestamp format".to_string()
            }
            AuthError::Validation(NonceError::Length(_)) => "Invalid nonce length".to_string(),
            AuthError::Validation(NonceError::Format) => "Invalid nonce format".to_string(),
            AuthError::Persistence(_) => "Database error".to_string(),
            AuthError::Internal(message) => format!("Processing error: {message}"),
        }
    }
}

/// Parses and validates a raw `AUTH` line.
///
/// Checks run in a fixed order: field layout, numbers, nonce length, nonce
/// alphabet. The first failure wins.
pub fn parse_auth(line: &str) -> Result<AuthRequest, AuthError> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    let [command, amount, timestamp, nonce] = fields.as_slice() else {
        return Err(AuthError::Parse(ParseError::Format));
    };
    if *command != AUTH {
        return Err(AuthError::Parse(ParseError::Format));
    }

    let (Ok(amount), Ok(unix_timestamp)) = (amount.parse::<Amount>(), timestamp.parse::<i64>())
    else {
        return Err(AuthError::Parse(ParseError::Number));
    };
    let nonce = Nonce::parse(nonce).map_err(AuthError::Validation)?;

    Ok(AuthRequest {
        amount,
        unix_timestamp,
        nonce,
    })
}

/// Decides `AUTH` requests and records every decision in the ledger.
///
/// The engine never fails: every error, including a panic inside the
/// decision path, comes back as a `DECLINED` response.
pub struct AuthDecisionEngine {
    ledger: LedgerBox,
    ids: IdentifierGenerator,
    processing_delay: Duration,
}

impl AuthDecisionEngine {
    /// Creates a new `AuthDecisionEngine`.
    ///
    /// # Arguments
    ///
    /// * `ledger` - Where decisions are appended.
    /// * `processing_delay` - Simulated upstream latency added to every request.
    pub fn new(ledger: LedgerBox, processing_delay: Duration) -> Self {
        Self::with_identifiers(ledger, IdentifierGenerator::new(), processing_delay)
    }

    pub fn with_identifiers(
        ledger: LedgerBox,
        ids: IdentifierGenerator,
        processing_delay: Duration,
    ) -> Self {
        Self {
            ledger,
            ids,
            processing_delay,
        }
    }

    /// Handles one raw `AUTH` line and returns the line to send back.
    pub async fn authorize(&self, line: &str) -> Response {
        let result = AssertUnwindSafe(self.process(line))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(AuthError::Internal(panic_message(payload.as_ref()))));

        tokio::time::sleep(self.processing_delay).await;

        match result {
            Ok(outcome) => Response::from(outcome),
            Err(e) => {
                tracing::warn!(error = %e, "Request declined");
                Response::declined(e.decline_reason())
            }
        }
    }

    async fn process(&self, line: &str) -> Result<AuthOutcome, AuthError> {
        let request = parse_auth(line)?;
        let outcome = self.decide(&request);

        let entry = LedgerEntry::from_decision(&request, &outcome);
        match self.ledger.insert(entry).await {
            Ok(record) => {
                tracing::info!(
                    record_id = record.id,
                    amount = %request.amount,
                    approved = outcome.is_approved(),
                    nonce = %request.nonce,
                    "Authorization recorded"
                );
            }
            // An approval that was not recorded must not reach the terminal.
            Err(e) if outcome.is_approved() => return Err(AuthError::Persistence(e)),
            Err(e) => {
                tracing::error!(error = %e, amount = %request.amount, "Failed to record decline");
            }
        }

        Ok(outcome)
    }

    fn decide(&self, request: &AuthRequest) -> AuthOutcome {
        if request.amount.within_limit() {
            AuthOutcome::Approved {
                auth_code: self.ids.auth_code(),
                masked_pan: self.ids.masked_pan(),
                rrn: self.ids.rrn(),
            }
        } else {
            AuthOutcome::Declined {
                reason: format!(
                    "Amount ${} exceeds limit (${})",
                    request.amount,
                    Amount::new(APPROVAL_LIMIT)
                ),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown failure".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::TransactionLedger;
    use crate::domain::transaction::{MASKED_PAN, TransactionRecord};
    use crate::error::Result;
    use crate::infrastructure::in_memory::InMemoryLedger;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct FailingLedger;

    #[async_trait]
    impl TransactionLedger for FailingLedger {
        async fn insert(&self, _entry: LedgerEntry) -> Result<TransactionRecord> {
            Err(GatewayError::Storage("disk full".to_string()))
        }

        async fn query_last(&self, _n: usize) -> Result<Vec<TransactionRecord>> {
            Ok(Vec::new())
        }
    }

    struct PanickingLedger;

    #[async_trait]
    impl TransactionLedger for PanickingLedger {
        async fn insert(&self, _entry: LedgerEntry) -> Result<TransactionRecord> {
            panic!("ledger exploded")
        }

        async fn query_last(&self, _n: usize) -> Result<Vec<TransactionRecord>> {
            Ok(Vec::new())
        }
    }

    fn engine_with(ledger: InMemoryLedger) -> AuthDecisionEngine {
        AuthDecisionEngine::with_identifiers(
            Box::new(ledger),
            IdentifierGenerator::seeded(42),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_parse_valid_request() {
        let request = parse_auth("AUTH|12.34|1700000000|A1B2C3D4").unwrap();
        assert_eq!(request.amount.value(), dec!(12.34));
        assert_eq!(request.unix_timestamp, 1_700_000_000);
        assert_eq!(request.nonce.as_str(), "A1B2C3D4");
    }

    #[test]
    fn test_parse_failures_in_order() {
        let reason = |line: &str| parse_auth(line).unwrap_err().decline_reason();

        assert_eq!(reason("AUTH|1.00|1"), "Invalid AUTH format");
        assert_eq!(reason("AUTH|1.00|1|ABCDEFAB|extra"), "Invalid AUTH format");
        assert_eq!(reason("AUTHX|1.00|1|ABCDEFAB"), "Invalid AUTH format");
        assert_eq!(
            reason("AUTH|notanumber|123|ABCDEFAB"),
            "Invalid amount or timestamp format"
        );
        assert_eq!(
            reason("AUTH|1.00|yesterday|ABCDEFAB"),
            "Invalid amount or timestamp format"
        );
        // Numbers are checked before the nonce.
        assert_eq!(reason("AUTH|x|1|ABC"), "Invalid amount or timestamp format");
        assert_eq!(reason("AUTH|1.00|1|ABC"), "Invalid nonce length");
        assert_eq!(reason("AUTH|1.00|1|1234567G"), "Invalid nonce format");
        assert_eq!(reason("AUTH|1.00|1|éééé"), "Invalid nonce format");
    }

    #[tokio::test]
    async fn test_amount_beyond_precision_is_not_rounded() {
        let ledger = InMemoryLedger::new();
        let engine = engine_with(ledger.clone());

        let response = engine
            .authorize("AUTH|50.4999999999999999999999999999|1700000000|A1B2C3D4")
            .await;
        assert_eq!(
            response,
            Response::declined("Invalid amount or timestamp format")
        );
        assert!(ledger.query_last(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_threshold_boundaries() {
        let engine = engine_with(InMemoryLedger::new());

        let below = engine.authorize("AUTH|50.49|1700000000|A1B2C3D4").await;
        assert!(matches!(below, Response::Approved { .. }));

        let at = engine.authorize("AUTH|50.50|1700000000|A1B2C3D4").await;
        assert_eq!(
            at,
            Response::declined("Amount $50.50 exceeds limit ($50.50)")
        );

        let above = engine.authorize("AUTH|50.51|1700000000|A1B2C3D4").await;
        assert_eq!(
            above,
            Response::declined("Amount $50.51 exceeds limit ($50.50)")
        );
    }

    #[tokio::test]
    async fn test_approval_is_recorded() {
        let ledger = InMemoryLedger::new();
        let engine = engine_with(ledger.clone());

        let response = engine.authorize("AUTH|12.34|1700000000|A1B2C3D4").await;
        let Response::Approved {
            auth_code,
            masked_pan,
            rrn,
        } = response
        else {
            panic!("expected approval, got {response:?}");
        };
        assert_eq!(auth_code.len(), 6);
        assert_eq!(masked_pan, MASKED_PAN);
        assert_eq!(rrn.len(), 12);

        let records = ledger.query_last(1).await.unwrap();
        let record = &records[0];
        assert_eq!(record.amount.value(), dec!(12.34));
        assert!(record.approved);
        assert_eq!(record.auth_code, auth_code);
        assert_eq!(record.masked_pan, masked_pan);
        assert_eq!(record.rrn, rrn);
        assert_eq!(record.nonce, "A1B2C3D4");
    }

    #[tokio::test]
    async fn test_decline_is_recorded_without_artifacts() {
        let ledger = InMemoryLedger::new();
        let engine = engine_with(ledger.clone());

        let response = engine.authorize("AUTH|99.99|1700000000|A1B2C3D4").await;
        assert_eq!(
            response.to_string(),
            "DECLINED|Amount $99.99 exceeds limit ($50.50)"
        );

        let record = &ledger.query_last(1).await.unwrap()[0];
        assert!(!record.approved);
        assert!(record.auth_code.is_empty());
        assert!(record.masked_pan.is_empty());
        assert!(record.rrn.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_requests_are_not_recorded() {
        let ledger = InMemoryLedger::new();
        let engine = engine_with(ledger.clone());

        for line in [
            "AUTH|1.00|1",
            "AUTH|notanumber|123|ABCDEFAB",
            "AUTH|1.00|1|ABC",
            "AUTH|1.00|1|1234567G",
        ] {
            assert!(matches!(
                engine.authorize(line).await,
                Response::Declined(_)
            ));
        }
        assert!(ledger.query_last(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_short_nonce_declined_regardless_of_amount() {
        let engine = engine_with(InMemoryLedger::new());
        for amount in ["1.00", "99.99"] {
            let line = format!("AUTH|{amount}|1700000000|ABC");
            assert_eq!(
                engine.authorize(&line).await.to_string(),
                "DECLINED|Invalid nonce length"
            );
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_voids_approval() {
        let engine =
            AuthDecisionEngine::new(Box::new(FailingLedger), Duration::ZERO);
        let response = engine.authorize("AUTH|12.34|1700000000|A1B2C3D4").await;
        assert_eq!(response.to_string(), "DECLINED|Database error");
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_decline() {
        let engine =
            AuthDecisionEngine::new(Box::new(FailingLedger), Duration::ZERO);
        let response = engine.authorize("AUTH|99.99|1700000000|A1B2C3D4").await;
        assert_eq!(
            response.to_string(),
            "DECLINED|Amount $99.99 exceeds limit ($50.50)"
        );
    }

    #[tokio::test]
    async fn test_internal_failure_becomes_decline() {
        let engine =
            AuthDecisionEngine::new(Box::new(PanickingLedger), Duration::ZERO);
        let response = engine.authorize("AUTH|12.34|1700000000|A1B2C3D4").await;
        assert_eq!(
            response.to_string(),
            "DECLINED|Processing error: ledger exploded"
        );
    }

    #[tokio::test]
    async fn test_processing_delay_applied() {
        let engine = AuthDecisionEngine::new(
            Box::new(InMemoryLedger::new()),
            Duration::from_millis(100),
        );
        let started = std::time::Instant::now();
        engine.authorize("AUTH|1.00|1|ABC").await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
