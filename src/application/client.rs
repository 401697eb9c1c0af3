use super::retry::{NextStep, RetrySchedule};
use crate::config::ClientConfig;
use crate::domain::identifiers::IdentifierGenerator;
use crate::domain::transaction::Amount;
use crate::error::{GatewayError, Result};
use crate::interfaces::wire::codec::LineCodec;
use crate::interfaces::wire::handshake;
use crate::interfaces::wire::messages::{PING, PONG, auth_line};
use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Opens a fresh connection for every attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    async fn connect(&self) -> Result<Self::Stream>;
}

/// Connects over TCP with a bounded connect timeout.
pub struct TcpConnector {
    addr: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> Result<TcpStream> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.addr.as_str()))
            .await
        {
            Ok(stream) => Ok(stream?),
            Err(_) => Err(GatewayError::Timeout(self.connect_timeout)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Connecting,
    Handshaking,
    AwaitingResponse,
    Done,
    Failed,
}

/// Drives one sale from connect to final response, retrying with backoff.
pub struct ClientSession<C: Connector> {
    connector: C,
    config: ClientConfig,
    ids: IdentifierGenerator,
    state: ClientState,
}

impl<C: Connector> ClientSession<C> {
    pub fn new(connector: C, config: ClientConfig) -> Self {
        Self::with_identifiers(connector, config, IdentifierGenerator::new())
    }

    pub fn with_identifiers(connector: C, config: ClientConfig, ids: IdentifierGenerator) -> Self {
        Self {
            connector,
            config,
            ids,
            state: ClientState::Idle,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Requests authorization of `amount` and returns the gateway's final
    /// response line (`APPROVED|...` or `DECLINED|...`).
    ///
    /// Fails with [`GatewayError::RetriesExhausted`] once every attempt the
    /// retry policy allows has failed.
    pub async fn send_sale(&mut self, amount: Amount) -> Result<String> {
        let mut schedule = RetrySchedule::new(self.config.retry);

        loop {
            let attempt = schedule.attempt();
            tracing::info!(attempt, amount = %amount, "Starting authorization attempt");

            let error = match self.run_attempt(amount, &mut schedule).await {
                Ok(response) => {
                    self.state = ClientState::Done;
                    return Ok(response);
                }
                Err(e) => e,
            };
            tracing::warn!(attempt, error = %error, "Attempt failed");

            match schedule.on_failure() {
                NextStep::Retry { attempt, delay } => {
                    tracing::info!(
                        next_attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                NextStep::GiveUp => {
                    self.state = ClientState::Failed;
                    return Err(GatewayError::RetriesExhausted {
                        attempts: schedule.attempts_made(),
                        last_error: Box::new(error),
                    });
                }
            }
        }
    }

    async fn run_attempt(
        &mut self,
        amount: Amount,
        schedule: &mut RetrySchedule,
    ) -> Result<String> {
        loop {
            self.state = ClientState::Connecting;
            let stream = self.connector.connect().await?;
            let mut codec =
                LineCodec::new(stream, self.config.max_line_len, self.config.read_timeout);

            self.state = ClientState::Handshaking;
            if let Err(e) = handshake::initiate(&mut codec).await {
                codec.close().await;
                if schedule.take_handshake_grace() {
                    tracing::warn!(error = %e, "Handshake failed on first attempt, retrying once");
                    continue;
                }
                return Err(e);
            }

            let result = self.await_response(&mut codec, amount).await;
            codec.close().await;
            return result;
        }
    }

    async fn await_response<S>(
        &mut self,
        codec: &mut LineCodec<S>,
        amount: Amount,
    ) -> Result<String>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let nonce = self.ids.nonce();
        codec
            .write_line(&auth_line(amount, unix_now(), &nonce))
            .await?;
        self.state = ClientState::AwaitingResponse;

        let interval = self.config.keepalive_interval;
        let mut keepalives = 0;
        loop {
            match codec.read_line_within(interval).await {
                Ok(Some(line)) if line == PONG => tracing::debug!("Keepalive acknowledged"),
                Ok(Some(line)) if line.is_empty() => {}
                Ok(Some(line)) => return Ok(line),
                Ok(None) => return Err(GatewayError::ConnectionClosed),
                Err(GatewayError::Timeout(_)) if keepalives < self.config.max_keepalives => {
                    keepalives += 1;
                    tracing::debug!(keepalives, "No response yet, sending keepalive");
                    codec.write_line(PING).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
