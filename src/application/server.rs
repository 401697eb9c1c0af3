use super::engine::AuthDecisionEngine;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::interfaces::wire::codec::LineCodec;
use crate::interfaces::wire::handshake::{self, HandshakeState};
use crate::interfaces::wire::messages::{Request, Response};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, ToSocketAddrs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Handshaking,
    Serving,
    Closed,
}

/// Drives one terminal connection from handshake to disconnect.
pub struct ServerSession<'a, S> {
    codec: LineCodec<S>,
    engine: &'a AuthDecisionEngine,
    peer: String,
    state: SessionState,
}

impl<'a, S> ServerSession<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        engine: &'a AuthDecisionEngine,
        config: &ServerConfig,
    ) -> Self {
        Self {
            codec: LineCodec::new(stream, config.max_line_len, config.read_timeout),
            engine,
            peer: peer.into(),
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session to completion. Every exit path closes the connection
    /// and ends in [`SessionState::Closed`]; failures are logged, never returned.
    pub async fn run(mut self) -> SessionState {
        tracing::info!(peer = %self.peer, "Terminal connected");

        match self.serve().await {
            Ok(()) => tracing::info!(peer = %self.peer, "Session ended"),
            Err(e) => tracing::warn!(peer = %self.peer, error = %e, "Session aborted"),
        }

        self.state = SessionState::Closed;
        self.codec.close().await;
        SessionState::Closed
    }

    async fn serve(&mut self) -> Result<()> {
        self.state = SessionState::Handshaking;
        if handshake::accept(&mut self.codec).await? != HandshakeState::Established {
            return Ok(());
        }
        self.state = SessionState::Serving;

        while let Some(line) = self.codec.read_line().await? {
            let response = match Request::classify(&line) {
                Request::End => break,
                Request::Ping => {
                    tracing::debug!(peer = %self.peer, "Keepalive");
                    Response::Pong
                }
                Request::Auth(raw) => self.engine.authorize(raw).await,
                Request::Unknown => {
                    tracing::warn!(peer = %self.peer, line = %line, "Unrecognized request");
                    Response::declined("Invalid request format")
                }
            };
            self.codec.write_line(&response.to_string()).await?;
        }

        Ok(())
    }
}

/// Accepts terminals one at a time and serves each to completion before
/// accepting the next.
pub struct GatewayServer {
    listener: TcpListener,
    engine: AuthDecisionEngine,
    config: ServerConfig,
}

impl GatewayServer {
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        engine: AuthDecisionEngine,
        config: ServerConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, engine, config))
    }

    pub fn from_listener(
        listener: TcpListener,
        engine: AuthDecisionEngine,
        config: ServerConfig,
    ) -> Self {
        Self {
            listener,
            engine,
            config,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until the task is dropped. Accept failures are logged and skipped.
    pub async fn run(self) {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "Payment gateway listening");
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    continue;
                }
            };
            ServerSession::new(stream, peer.to_string(), &self.engine, &self.config)
                .run()
                .await;
        }
    }
}
