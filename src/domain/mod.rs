//! Domain types for the authorization gateway: request and outcome values,
//! the approval policy, identifier generation and the ledger port.

pub mod identifiers;
pub mod ports;
pub mod transaction;
