// Streaming deflate compressor.
//
// Input is fed to flate2 without flushing; whatever it produces goes to the
// sink, with the overflow parked in the backlog. Finalize drives the stream
// to its end exactly once, after which the encoder only drains.

use flate2::{Compress, FlushCompress};
use log::debug;

use super::{DeflateOptions, SCRATCH_SIZE};
use crate::buffer::{Backlog, ByteSink, InputBuffer};
use crate::transcoder::{CodecError, Result, Status, Transcoder, ensure_flushed};

/// Incremental deflate compressor.
///
/// # Example
/// ```no_run
/// use oxicodec::compress::{DeflateEncoder, DeflateOptions};
/// use oxicodec::transcode;
///
/// let mut encoder = DeflateEncoder::new(DeflateOptions::default());
/// let compressed = transcode(&mut encoder, b"hello hello hello").unwrap();
/// ```
pub struct DeflateEncoder {
    compress: Compress,
    scratch: Box<[u8]>,
    backlog: Backlog,
    finished: bool,
}

impl DeflateEncoder {
    pub fn new(options: DeflateOptions) -> Self {
        Self {
            compress: Compress::new(options.level, options.framing.zlib_header()),
            scratch: vec![0u8; SCRATCH_SIZE].into_boxed_slice(),
            backlog: Backlog::new(),
            finished: false,
        }
    }

    /// Uncompressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.compress.total_in()
    }

    /// Compressed bytes produced so far (delivered or parked).
    pub fn total_out(&self) -> u64 {
        self.compress.total_out()
    }

    /// Compressed bytes waiting for output space.
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }

    /// Whether the stream has been closed by `finalize`.
    pub fn is_closed(&self) -> bool {
        self.finished
    }

    /// Run one compress call, returning (consumed, produced, status).
    fn step(&mut self, data: &[u8], flush: FlushCompress) -> Result<(usize, usize, flate2::Status)> {
        let before_in = self.compress.total_in();
        let before_out = self.compress.total_out();
        let status = self
            .compress
            .compress(data, &mut self.scratch, flush)
            .map_err(|e| CodecError::Deflate(e.to_string()))?;
        let consumed = (self.compress.total_in() - before_in) as usize;
        let produced = (self.compress.total_out() - before_out) as usize;
        Ok((consumed, produced, status))
    }
}

impl Default for DeflateEncoder {
    fn default() -> Self {
        Self::new(DeflateOptions::default())
    }
}

impl std::fmt::Debug for DeflateEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateEncoder")
            .field("total_in", &self.total_in())
            .field("total_out", &self.total_out())
            .field("pending", &self.pending())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Transcoder for DeflateEncoder {
    fn transform(
        &mut self,
        input: &mut InputBuffer<'_>,
        output: &mut dyn ByteSink,
    ) -> Result<Status> {
        if self.finished && !input.is_empty() {
            return Err(CodecError::Closed);
        }
        loop {
            self.backlog.drain_into(output);
            if !self.backlog.is_empty() {
                return Ok(Status::NeedOutput);
            }
            if input.is_empty() {
                return Ok(Status::NeedInput);
            }
            let (consumed, produced, _) = self.step(input.unread(), FlushCompress::None)?;
            input.advance(consumed);
            self.backlog.emit(&self.scratch[..produced], output);
            if consumed == 0 && produced == 0 {
                return Err(CodecError::Deflate("compressor made no progress".into()));
            }
        }
    }

    fn finalize(&mut self, output: &mut dyn ByteSink) -> Result<()> {
        if !self.finished {
            loop {
                let (_, produced, status) = self.step(&[], FlushCompress::Finish)?;
                self.backlog.extend(&self.scratch[..produced]);
                match status {
                    flate2::Status::StreamEnd => break,
                    _ if produced == 0 => {
                        return Err(CodecError::Deflate("compressor stalled while finishing".into()));
                    }
                    _ => {}
                }
            }
            self.finished = true;
            debug!(
                "deflate: finished, {} bytes in, {} bytes out",
                self.total_in(),
                self.total_out()
            );
        }
        self.backlog.drain_into(output);
        ensure_flushed(self.backlog.len())
    }
}

/// Compress `data` in one call.
pub fn compress(data: &[u8], options: DeflateOptions) -> Result<Vec<u8>> {
    crate::transcoder::transcode(&mut DeflateEncoder::new(options), data)
}
