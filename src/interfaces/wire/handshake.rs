//! Greeting exchange that must succeed before any business message.
//!
//! ```text
//! Terminal                          Gateway
//!   |  -- HELLO|GW|1.0 ------------>  |
//!   |  <-- HELLO|TERM|1.0 ----------  |
//! ```
//!
//! Both greetings are compared for exact equality; the version is never
//! parsed or negotiated. A gateway that receives anything else closes the
//! connection without replying.

use super::codec::LineCodec;
use crate::error::{GatewayError, Result};
use tokio::io::{AsyncRead, AsyncWrite};

/// Sent by the terminal.
pub const CLIENT_GREETING: &str = "HELLO|GW|1.0";
/// Sent back by the gateway.
pub const SERVER_GREETING: &str = "HELLO|TERM|1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeState {
    #[default]
    AwaitingGreeting,
    Established,
    Failed,
}

/// Gateway side: read one line and answer only an exact greeting.
///
/// Returns [`HandshakeState::Failed`] on a wrong greeting or an immediate
/// disconnect. Transport errors are propagated.
pub async fn accept<S>(codec: &mut LineCodec<S>) -> Result<HandshakeState>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match codec.read_line().await?.as_deref() {
        Some(CLIENT_GREETING) => {
            codec.write_line(SERVER_GREETING).await?;
            Ok(HandshakeState::Established)
        }
        Some(other) => {
            tracing::warn!(greeting = other, "Rejected handshake greeting");
            Ok(HandshakeState::Failed)
        }
        None => Ok(HandshakeState::Failed),
    }
}

/// Terminal side: send the greeting, then require the exact reply.
pub async fn initiate<S>(codec: &mut LineCodec<S>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    codec.write_line(CLIENT_GREETING).await?;
    match codec.read_line().await? {
        Some(reply) if reply == SERVER_GREETING => Ok(()),
        Some(reply) => Err(GatewayError::Handshake(format!(
            "unexpected reply {reply:?}"
        ))),
        None => Err(GatewayError::Handshake(
            "connection closed before reply".to_string(),
        )),
    }
}
