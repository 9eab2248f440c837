// The Transcoder contract.
//
// A transcoder is an owned, mutable state machine that turns one byte stream
// into another a piece at a time. It is driven by repeated `transform` calls
// as input and output space become available, and closed by `finalize`.
//
// Two channels are kept apart:
//   - `Status`: transient "call me again" signals (need input / need output)
//   - `CodecError`: fatal conditions that abort the stream

use std::io;

use crate::buffer::{ByteSink, InputBuffer};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal transcoding failure.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A byte outside the Base64 alphabet, or padding in the wrong place.
    #[error("invalid base64 byte {byte:#04X} at offset {offset}")]
    InvalidBase64 { byte: u8, offset: u64 },

    /// A quoted-printable `=` escape not followed by two hex digits.
    #[error("invalid quoted-printable escape byte {byte:#04X}")]
    InvalidEscape { byte: u8 },

    /// The stream ended in the middle of a fixed-size unit.
    #[error("not enough bytes to complete the {unit}: missing {missing} byte(s)")]
    IncompleteUnit { unit: &'static str, missing: usize },

    /// The stream does not start with the GZIP magic number.
    #[error("invalid gzip magic: expected [1F, 8B], got {found:02X?}")]
    BadMagic { found: [u8; 2] },

    /// GZIP compression method other than deflate.
    #[error("unsupported gzip compression method {0}")]
    UnsupportedMethod(u8),

    /// FHCRC did not match the header bytes.
    #[error("gzip header crc mismatch: expected {expected:#06X}, got {actual:#06X}")]
    HeaderChecksumMismatch { expected: u16, actual: u16 },

    /// Footer CRC-32 did not match the decompressed data.
    #[error("checksum mismatch: expected {expected:#010X}, got {actual:#010X}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Footer ISIZE did not match the decompressed length (mod 2^32).
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u32, actual: u32 },

    /// Finalize was called before the compressed stream reached its end.
    #[error("compressed stream ended prematurely")]
    TruncatedStream,

    /// The compressed data is corrupt.
    #[error("inflate failed: {0}")]
    Inflate(String),

    #[error("deflate failed: {0}")]
    Deflate(String),

    /// Finalize could not drain its state into the destination.
    #[error("could not flush {remaining} byte(s) to the output")]
    FlushIncomplete { remaining: usize },

    /// Input offered after the transcoder was finalized.
    #[error("transcoder already finalized")]
    Closed,

    /// Bytes offered after a Finishable transcoder reached its end.
    #[error("stream already ended, {bytes} byte(s) refused")]
    PastEnd { bytes: usize },

    /// The stream previously failed; no further output is produced.
    #[error("stream already failed")]
    Poisoned,

    /// XOR mask without key bytes.
    #[error("xor key must not be empty")]
    EmptyKey,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<CodecError> for io::Error {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Io(inner) => inner,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

pub type Result<T, E = CodecError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Why a `transform` call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// All offered input was consumed; call again with more.
    NeedInput,
    /// Output is full or output is still parked internally; call again with
    /// more space.
    NeedOutput,
    /// The transcoder reached its own logical end of stream. Input past that
    /// point is left unconsumed.
    Finished,
}

impl Status {
    /// Status of a transcoder that stopped with `pending` parked bytes and
    /// `input` left over.
    #[inline]
    pub(crate) fn after(input: &InputBuffer<'_>, pending: bool) -> Self {
        if pending || !input.is_empty() {
            Self::NeedOutput
        } else {
            Self::NeedInput
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A transform that knows where its own stream ends, independently of the
/// transport's EOF.
pub trait Finishable {
    fn is_finished(&self) -> bool;
}

/// Stateful, resumable, incremental byte transform.
///
/// Implementations never drop bytes: anything the sink refuses is retained
/// and offered again on the next call, and no more input is consumed while
/// output is pending.
pub trait Transcoder {
    /// Consume as much of `input` as can be used and produce as much as fits
    /// into `output`. Never blocks.
    fn transform(&mut self, input: &mut InputBuffer<'_>, output: &mut dyn ByteSink)
    -> Result<Status>;

    /// Flush remaining state as the final logical unit.
    ///
    /// Fails with `FlushIncomplete` when `output` cannot absorb everything.
    fn finalize(&mut self, output: &mut dyn ByteSink) -> Result<()>;

    /// The `Finishable` capability, when this transcoder has one.
    fn finishable(&self) -> Option<&dyn Finishable> {
        None
    }

    /// True when the `Finishable` capability is present and reports the end.
    fn reports_finished(&self) -> bool {
        self.finishable().is_some_and(|f| f.is_finished())
    }
}

impl<T: Transcoder + ?Sized> Transcoder for Box<T> {
    fn transform(
        &mut self,
        input: &mut InputBuffer<'_>,
        output: &mut dyn ByteSink,
    ) -> Result<Status> {
        (**self).transform(input, output)
    }

    fn finalize(&mut self, output: &mut dyn ByteSink) -> Result<()> {
        (**self).finalize(output)
    }

    fn finishable(&self) -> Option<&dyn Finishable> {
        (**self).finishable()
    }
}

/// Fail with `FlushIncomplete` if anything is still parked.
#[inline]
pub(crate) fn ensure_flushed(remaining: usize) -> Result<()> {
    if remaining == 0 {
        Ok(())
    } else {
        Err(CodecError::FlushIncomplete { remaining })
    }
}

// ---------------------------------------------------------------------------
// Convenience function
// ---------------------------------------------------------------------------

/// Run `data` through `transcoder` and finalize, collecting the output.
///
/// Everything is held in memory, so this is meant for small payloads. For a
/// Finishable transcoder, bytes after its logical end are ignored.
pub fn transcode<T: Transcoder + ?Sized>(transcoder: &mut T, data: &[u8]) -> Result<Vec<u8>> {
    let mut input = InputBuffer::new(data);
    let mut output = Vec::with_capacity(data.len());
    loop {
        let before = input.position();
        let status = transcoder.transform(&mut input, &mut output)?;
        if status != Status::NeedOutput || input.position() == before {
            break;
        }
    }
    transcoder.finalize(&mut output)?;
    Ok(output)
}

/// Drive `transcoder` with input slices of `chunk` bytes and an output window
/// of `window` bytes, stopping early on `Finished`.
#[cfg(test)]
pub(crate) fn transcode_windowed<T: Transcoder + ?Sized>(
    transcoder: &mut T,
    data: &[u8],
    chunk: usize,
    window: usize,
) -> Result<Vec<u8>> {
    use crate::buffer::OutputBuffer;

    let mut out = Vec::new();
    let mut scratch = vec![0u8; window.max(1)];
    'feed: for piece in data.chunks(chunk.max(1)) {
        let mut input = InputBuffer::new(piece);
        loop {
            let mut sink = OutputBuffer::new(&mut scratch);
            let status = transcoder.transform(&mut input, &mut sink)?;
            out.extend_from_slice(sink.filled());
            match status {
                Status::NeedOutput => {}
                Status::NeedInput => break,
                Status::Finished => break 'feed,
            }
        }
    }
    transcoder.finalize(&mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
