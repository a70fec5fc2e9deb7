//! Worker stdin writer.
//!
//! The stdin pipe has exactly one owner. Each [`InputResponse`] is
//! serialised to a compact single-line JSON string, framed with `\n` by
//! [`WorkerCodec`], and flushed before [`ResponseWriter::send`] returns so
//! the blocked worker sees the reply immediately.

use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;
use tracing::{debug, warn};

use crate::protocol::codec::WorkerCodec;
use crate::protocol::event::InputResponse;
use crate::{AppError, Result};

/// Single writer for the worker's stdin.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    framed: FramedWrite<W, WorkerCodec>,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Wrap the worker's stdin.
    pub fn new(stdin: W) -> Self {
        Self {
            framed: FramedWrite::new(stdin, WorkerCodec::new()),
        }
    }

    /// Write one newline-terminated response and flush it.
    ///
    /// # Errors
    ///
    /// - [`AppError::Protocol`]`("failed to serialise …")` if serialisation fails.
    /// - [`AppError::Protocol`]`("write failed: …")` if the worker closed its stdin.
    pub async fn send(&mut self, response: &InputResponse) -> Result<()> {
        let line = response.to_line()?;

        self.framed.send(line).await.map_err(|e| {
            warn!(key = response.key.as_str(), error = %e, "response writer: write to stdin failed");
            AppError::Protocol(format!("write failed: {e}"))
        })?;

        debug!(
            key = response.key.as_str(),
            selected = response.value.len(),
            "response writer: input response delivered"
        );
        Ok(())
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.framed.into_inner()
    }
}
