//! Timeouts, limits and retry settings for both sides of the gateway.
//!
//! Every struct carries its production defaults through `Default`; tests
//! shrink the durations to keep runs fast.

use std::time::Duration;

/// Upper bound on a single protocol line, excluding the terminator.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

const fn default_socket_timeout() -> Duration {
    Duration::from_millis(3000)
}

/// Settings for the gateway (server) side.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Per-read timeout on a client connection. An idle client is dropped.
    pub read_timeout: Duration,
    /// Simulated upstream authorizer latency applied to every `AUTH`.
    pub processing_delay: Duration,
    pub max_line_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout: default_socket_timeout(),
            processing_delay: Duration::from_millis(100),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// Settings for the terminal (client) side.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    /// Timeout for handshake reads.
    pub read_timeout: Duration,
    /// Silence allowed while waiting for a response before a `PING` is sent.
    pub keepalive_interval: Duration,
    /// Consecutive keepalives without a final response before the attempt fails.
    pub max_keepalives: u32,
    pub max_line_len: usize,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_socket_timeout(),
            read_timeout: default_socket_timeout(),
            keepalive_interval: default_socket_timeout(),
            max_keepalives: 5,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            retry: RetryPolicy::default(),
        }
    }
}

/// Exponential backoff policy for client attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay to wait after failed attempt number `attempt` (zero-based):
    /// `base_delay * 2^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
        }
    }
}
