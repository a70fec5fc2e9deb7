//! NDJSON framing for worker streams.
//!
//! Wraps [`tokio_util::codec::AnyDelimiterCodec`] with a `\n` delimiter and a
//! configurable maximum line length so a worker that never terminates a
//! record cannot make the supervisor allocate without bound.
//!
//! [`LineFramer`] is the push-style front end used by the stdout reader: raw
//! chunks go in as they arrive from the pipe, complete records come out in
//! order, and the trailing partial record stays buffered until the next
//! chunk supplies its newline. It uses the larger [`MAX_EVENT_BYTES`] bound
//! and reports an oversized record instead of skipping it.

use bytes::BytesMut;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};

use crate::{AppError, Result};

/// Maximum stderr line length: 1 MiB. Longer lines are skipped.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Maximum stdout event length: 64 MiB. A longer record fails the session.
pub const MAX_EVENT_BYTES: usize = 64 * 1_048_576;

/// NDJSON codec for bidirectional worker streams.
///
/// Each `\n`-terminated record is one message. Decoded records have the
/// delimiter and any trailing `\r` removed; bytes that are not valid UTF-8
/// are replaced rather than rejected, because free-form diagnostic output
/// shares the stream with structured events.
///
/// # Decoder
///
/// Inbound records longer than the configured limit return
/// [`AppError::Protocol`]`("line too long: …")`; the codec then discards
/// input up to the next newline and resumes normally.
///
/// # Encoder
///
/// Outbound strings are encoded as `item\n`.
#[derive(Debug)]
pub struct WorkerCodec(AnyDelimiterCodec);

impl WorkerCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec with a custom per-line limit.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self(AnyDelimiterCodec::new_with_max_length(
            b"\n".to_vec(),
            b"\n".to_vec(),
            max_length,
        ))
    }
}

impl Default for WorkerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for WorkerCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let frame = self.0.decode(src).map_err(map_codec_error)?;
        Ok(frame.map(|bytes| to_text(&bytes)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let frame = self.0.decode_eof(src).map_err(map_codec_error)?;
        Ok(frame.map(|bytes| to_text(&bytes)))
    }
}

impl Encoder<String> for WorkerCodec {
    type Error = AppError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(map_codec_error)
    }
}

/// Push-style line reassembly over [`WorkerCodec`].
///
/// Unlike the stderr path, an oversized record here is an error: a lost
/// event could be an `input_request` the worker is blocked on.
#[derive(Debug)]
pub struct LineFramer {
    codec: WorkerCodec,
    buffer: BytesMut,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::with_max_length(MAX_EVENT_BYTES)
    }
}

impl LineFramer {
    /// Create a framer with the default [`MAX_EVENT_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a framer with a custom per-record limit.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            codec: WorkerCodec::with_max_length(max_length),
            buffer: BytesMut::new(),
        }
    }

    /// Append `chunk` to the pending input.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete, non-blank record.
    ///
    /// Returns `Ok(None)` once the buffered input holds no further newline.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] when the next record exceeds the
    /// limit. Records before it have already been returned.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.codec.decode(&mut self.buffer)? {
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    /// Append `chunk` and return every record it completes, in order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if any completed record is oversized.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.push(chunk);
        let mut lines = Vec::new();
        while let Some(line) = self.next_line()? {
            lines.push(line);
        }
        Ok(lines)
    }

    /// Drain whatever unterminated text remains at end of stream.
    ///
    /// Returns `Ok(None)` when the residue is empty or blank.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if the residue exceeds the limit.
    pub fn finish(&mut self) -> Result<Option<String>> {
        let residue = self.codec.decode_eof(&mut self.buffer)?;
        Ok(residue.filter(|text| !text.trim().is_empty()))
    }

    /// Number of buffered bytes not yet terminated by a newline.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn to_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn map_codec_error(e: AnyDelimiterCodecError) -> AppError {
    match e {
        AnyDelimiterCodecError::MaxChunkLengthExceeded => {
            AppError::Protocol("line too long: exceeded maximum record length".into())
        }
        AnyDelimiterCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
    }
}
