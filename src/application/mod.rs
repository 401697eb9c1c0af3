//! Application layer: the authorization decision engine and the two protocol
//! sessions built around it.
//!
//! The gateway side ([`server`]) serves one terminal at a time and hands every
//! `AUTH` line to [`engine::AuthDecisionEngine`]. The terminal side
//! ([`client`]) runs a single sale with keepalives and the backoff schedule
//! from [`retry`].

pub mod client;
pub mod engine;
pub mod retry;
pub mod server;
