use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amounts strictly below this limit are approved.
pub const APPROVAL_LIMIT: Decimal = dec!(50.50);

/// Display placeholder returned in place of a card number. No card data is
/// ever read or produced.
pub const MASKED_PAN: &str = "************1111";

pub const NONCE_MIN_LEN: usize = 8;
pub const NONCE_MAX_LEN: usize = 16;

/// A sale amount as sent on the wire.
///
/// Keeps the exact decimal that was parsed; rounding to cents only happens
/// when the amount is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Fixed-point comparison against [`APPROVAL_LIMIT`].
    pub fn within_limit(&self) -> bool {
        self.0 < APPROVAL_LIMIT
    }

    /// Rounded to cents, half away from zero.
    pub fn to_cents(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    /// Rejects input that `Decimal` could only hold after rounding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str_exact(s).map(Self)
    }
}

/// Always renders exactly two decimal places.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_cents())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceError {
    Length(usize),
    Format,
}

/// Single-use freshness token: 8 to 16 hexadecimal characters.
///
/// Nonces are not tracked across requests, so a replayed nonce is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    /// Length, in bytes, is checked before the alphabet.
    pub fn parse(raw: &str) -> Result<Self, NonceError> {
        let len = raw.len();
        if !(NONCE_MIN_LEN..=NONCE_MAX_LEN).contains(&len) {
            return Err(NonceError::Length(len));
        }
        if !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(NonceError::Format);
        }
        Ok(Self(raw.to_string()))
    }

    /// For strings drawn from the hex alphabet with an in-range length.
    pub(crate) fn from_generated(raw: String) -> Self {
        debug_assert!(Self::parse(&raw).is_ok());
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated `AUTH` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub amount: Amount,
    pub unix_timestamp: i64,
    pub nonce: Nonce,
}

/// Exactly one decision is made per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Approved {
        auth_code: String,
        masked_pan: String,
        rrn: String,
    },
    Declined {
        reason: String,
    },
}

impl AuthOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, AuthOutcome::Approved { .. })
    }
}

/// A decision ready to be appended to the ledger. The ledger assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub amount: Amount,
    pub approved: bool,
    pub auth_code: String,
    pub masked_pan: String,
    pub rrn: String,
    pub unix_timestamp: i64,
    pub nonce: String,
}

impl LedgerEntry {
    /// Declined entries carry empty approval artifacts.
    pub fn from_decision(request: &AuthRequest, outcome: &AuthOutcome) -> Self {
        let (approved, auth_code, masked_pan, rrn) = match outcome {
            AuthOutcome::Approved {
                auth_code,
                masked_pan,
                rrn,
            } => (true, auth_code.clone(), masked_pan.clone(), rrn.clone()),
            AuthOutcome::Declined { .. } => (false, String::new(), String::new(), String::new()),
        };
        Self {
            amount: request.amount,
            approved,
            auth_code,
            masked_pan,
            rrn,
            unix_timestamp: request.unix_timestamp,
            nonce: request.nonce.as_str().to_string(),
        }
    }

    pub fn into_record(self, id: u64) -> TransactionRecord {
        TransactionRecord {
            id,
            amount: self.amount,
            approved: self.approved,
            auth_code: self.auth_code,
            masked_pan: self.masked_pan,
            rrn: self.rrn,
            unix_timestamp: self.unix_timestamp,
            nonce: self.nonce,
        }
    }
}

/// An append-only ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: u64,
    pub amount: Amount,
    pub approved: bool,
    pub auth_code: String,
    pub masked_pan: String,
    pub rrn: String,
    pub unix_timestamp: i64,
    pub nonce: String,
}
