use crate::domain::transaction::{Amount, AuthOutcome, Nonce};
use std::fmt;

pub const PING: &str = "PING";
pub const PONG: &str = "PONG";
pub const AUTH: &str = "AUTH";
pub const APPROVED: &str = "APPROVED";
pub const DECLINED: &str = "DECLINED";
pub const FIELD_SEPARATOR: char = '|';

/// How the gateway dispatches one received line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// Empty line: the terminal is done.
    End,
    Ping,
    /// Raw `AUTH|...` line, validated by the decision engine.
    Auth(&'a str),
    Unknown,
}

impl<'a> Request<'a> {
    pub fn classify(line: &'a str) -> Self {
        if line.is_empty() {
            Request::End
        } else if line == PING {
            Request::Ping
        } else if line.starts_with("AUTH|") {
            Request::Auth(line)
        } else {
            Request::Unknown
        }
    }
}

/// Formats `AUTH|<amount:2dp>|<unixTimestamp>|<nonce>`.
pub fn auth_line(amount: Amount, unix_timestamp: i64, nonce: &Nonce) -> String {
    format!("{AUTH}|{amount}|{unix_timestamp}|{nonce}")
}

/// A line sent by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Pong,
    Approved {
        auth_code: String,
        masked_pan: String,
        rrn: String,
    },
    Declined(String),
}

impl Response {
    pub fn declined(reason: impl Into<String>) -> Self {
        Response::Declined(reason.into())
    }
}

impl From<AuthOutcome> for Response {
    fn from(outcome: AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Approved {
                auth_code,
                masked_pan,
                rrn,
            } => Response::Approved {
                auth_code,
                masked_pan,
                rrn,
            },
            AuthOutcome::Declined { reason } => Response::Declined(reason),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Pong => f.write_str(PONG),
            Response::Approved {
                auth_code,
                masked_pan,
                rrn,
            } => write!(f, "{APPROVED}|{auth_code}|{masked_pan}|{rrn}"),
            Response::Declined(reason) => write!(f, "{DECLINED}|{reason}"),
        }
    }
}
