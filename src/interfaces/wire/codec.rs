use crate::error::{GatewayError, Result};
use futures::{SinkExt, StreamExt};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

/// Frames a bidirectional byte stream into `\n`-terminated text lines.
///
/// One trailing `\r` is stripped from each line read; nothing else is trimmed.
/// Lines longer than `max_line_len` bytes before the `\n` are rejected with
/// [`GatewayError::LineTooLong`] instead of being buffered without bound.
///
/// Buffered bytes live in the `Framed` read buffer, so a timed-out read loses
/// nothing and the next read resumes the same line.
pub struct LineCodec<S> {
    framed: Framed<S, LinesCodec>,
    max_line_len: usize,
    io_timeout: Duration,
}

impl<S> LineCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, max_line_len: usize, io_timeout: Duration) -> Self {
        Self {
            framed: Framed::new(stream, LinesCodec::new_with_max_length(max_line_len)),
            max_line_len,
            io_timeout,
        }
    }

    /// Reads one line using the codec's I/O timeout.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream and no partial
    /// line is buffered.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        self.read_line_within(self.io_timeout).await
    }

    /// Reads one line, failing with [`GatewayError::Timeout`] after `limit`.
    pub async fn read_line_within(&mut self, limit: Duration) -> Result<Option<String>> {
        match tokio::time::timeout(limit, self.framed.next()).await {
            Ok(Some(line)) => line.map(Some).map_err(|e| self.codec_error(e)),
            Ok(None) => Ok(None),
            Err(_) => Err(GatewayError::Timeout(limit)),
        }
    }

    /// Writes `text` followed by a single `\n` and flushes.
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        let limit = self.io_timeout;
        match tokio::time::timeout(limit, self.framed.send(text)).await {
            Ok(result) => result.map_err(|e| self.codec_error(e)),
            Err(_) => Err(GatewayError::Timeout(limit)),
        }
    }

    /// Flushes, shuts down the write side and drops the stream.
    pub async fn close(mut self) {
        let _ = SinkExt::<&str>::close(&mut self.framed).await;
    }

    fn codec_error(&self, error: LinesCodecError) -> GatewayError {
        match error {
            LinesCodecError::MaxLineLengthExceeded => GatewayError::LineTooLong {
                max: self.max_line_len,
            },
            LinesCodecError::Io(e) if e.kind() == io::ErrorKind::InvalidData => {
                GatewayError::InvalidUtf8
            }
            LinesCodecError::Io(e) => GatewayError::Io(e),
        }
    }
}
