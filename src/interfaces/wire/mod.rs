//! The `|`-delimited, newline-terminated text protocol spoken between
//! terminal and gateway.

pub mod codec;
pub mod handshake;
pub mod messages;
