//! NDJSON framing for the ACP wire format.
//!
//! Two decoders cover the two transport shapes:
//!
//! - [`FrameCodec`] wraps [`tokio_util::codec::LinesCodec`] for byte
//!   streams driven by [`FramedRead`](tokio_util::codec::FramedRead)
//!   (the stdio transport). A configurable maximum line length guards
//!   against unterminated or maliciously large frames.
//! - [`FrameDecoder`] is an incremental text decoder for transports that
//!   deliver arbitrary chunks (the socket transport). It buffers a
//!   trailing partial line across feeds and skips malformed lines without
//!   corrupting decode state.

use bytes::BytesMut;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};
use tracing::warn;

use crate::{AppError, Result};

/// Maximum line length accepted on the inbound stream: 1 MiB.
///
/// Lines exceeding this limit cause [`FrameCodec::decode`] to return
/// [`AppError::Codec`] with `"line too long"` rather than allocating
/// unbounded memory for a single frame.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// NDJSON codec for bidirectional ACP byte streams.
///
/// Delegates line-framing to [`LinesCodec`] with a fixed
/// [`MAX_LINE_BYTES`] limit. Each newline-terminated (`\n`) UTF-8 string
/// is one complete frame.
#[derive(Debug)]
pub struct FrameCodec(LinesCodec);

impl FrameCodec {
    /// Create a new `FrameCodec` with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next newline-terminated line from `src`.
    ///
    /// Returns `Ok(None)` when `src` contains no complete line yet.
    /// Returns `Err(AppError::Codec("line too long: …"))` when the line
    /// exceeds [`MAX_LINE_BYTES`].
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode(src).map_err(map_codec_error)
    }

    /// Decode the final line when the stream reaches EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode_eof(src).map_err(map_codec_error)
    }
}

impl Encoder<String> for FrameCodec {
    type Error = AppError;

    /// Encode `item` as a `\n`-terminated NDJSON line into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] on underlying I/O failures. The max-length
    /// limit is a decoder-side concern and is not enforced here.
    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(map_codec_error)
    }
}

/// One decoded frame: a single JSON value bound to one wire line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Parsed JSON value.
    pub value: Value,
    /// 1-based line number within the decoder's lifetime.
    pub line_number: u64,
    /// Raw line content without the trailing newline.
    pub raw: String,
}

/// Incremental NDJSON decoder over arbitrary text chunks.
///
/// A frame is only yielded once its terminating newline has been
/// observed; a trailing partial line is retained across [`feed`] calls.
/// A line that fails JSON decoding is logged and skipped; subsequent
/// lines in the same buffer continue to decode.
///
/// [`feed`]: FrameDecoder::feed
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
    line_number: u64,
}

impl FrameDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` to the buffer and yield every complete frame.
    ///
    /// Empty and whitespace-only lines are skipped. Malformed JSON lines
    /// are logged at `WARN` and skipped without affecting later lines.
    pub fn feed(&mut self, chunk: &str) -> Vec<Frame> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].to_owned();
            self.buffer.drain(..=pos);
            self.line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => frames.push(Frame {
                    value,
                    line_number: self.line_number,
                    raw: trimmed.to_owned(),
                }),
                Err(e) => {
                    warn!(
                        line_number = self.line_number,
                        error = %e,
                        "frame decoder: invalid JSON line, skipping"
                    );
                }
            }
        }

        frames
    }

    /// Clear the buffer and line-count bookkeeping.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.line_number = 0;
    }

    /// Number of complete lines consumed since creation or [`reset`].
    ///
    /// [`reset`]: FrameDecoder::reset
    #[must_use]
    pub fn lines_seen(&self) -> u64 {
        self.line_number
    }
}

/// Serialize `value` as a compact JSON frame terminated by one newline.
#[must_use]
pub fn encode_frame(value: &Value) -> String {
    let mut line = value.to_string();
    line.push('\n');
    line
}

/// Encode multiple values as consecutive single-frame encodings.
#[must_use]
pub fn encode_batch(values: &[Value]) -> String {
    values.iter().map(encode_frame).collect()
}

// ── Private helper ────────────────────────────────────────────────────────────

/// Map a [`LinesCodecError`] to an [`AppError`].
fn map_codec_error(e: LinesCodecError) -> AppError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            AppError::Codec(format!("line too long: exceeded {MAX_LINE_BYTES} bytes"))
        }
        LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
    }
}
