// Streaming inflate decompressor.
//
// A deflate stream carries its own end marker, so the decoder knows when it
// is done regardless of how many transport bytes follow. Bytes after the end
// are left unconsumed for the caller (GZIP reads its footer from them).

use flate2::{Decompress, FlushDecompress};
use log::debug;

use super::{DeflateOptions, Framing, SCRATCH_SIZE};
use crate::buffer::{Backlog, ByteSink, InputBuffer};
use crate::transcoder::{CodecError, Finishable, Result, Status, Transcoder, ensure_flushed};

/// Incremental inflate decompressor.
pub struct InflateDecoder {
    decompress: Decompress,
    scratch: Box<[u8]>,
    backlog: Backlog,
    /// The last call filled the scratch buffer, so flate2 may hold more.
    more: bool,
    finished: bool,
}

impl InflateDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            decompress: Decompress::new(framing.zlib_header()),
            scratch: vec![0u8; SCRATCH_SIZE].into_boxed_slice(),
            backlog: Backlog::new(),
            more: false,
            finished: false,
        }
    }

    /// Compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.decompress.total_in()
    }

    /// Decompressed bytes produced so far (delivered or parked).
    pub fn total_out(&self) -> u64 {
        self.decompress.total_out()
    }

    /// Decompressed bytes waiting for output space.
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }

    fn step(&mut self, data: &[u8]) -> Result<(usize, usize, flate2::Status)> {
        let before_in = self.decompress.total_in();
        let before_out = self.decompress.total_out();
        let status = self
            .decompress
            .decompress(data, &mut self.scratch, FlushDecompress::None)
            .map_err(|e| CodecError::Inflate(e.to_string()))?;
        let consumed = (self.decompress.total_in() - before_in) as usize;
        let produced = (self.decompress.total_out() - before_out) as usize;
        Ok((consumed, produced, status))
    }
}

impl Default for InflateDecoder {
    fn default() -> Self {
        Self::new(Framing::Raw)
    }
}

impl std::fmt::Debug for InflateDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflateDecoder")
            .field("total_in", &self.total_in())
            .field("total_out", &self.total_out())
            .field("pending", &self.pending())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Finishable for InflateDecoder {
    fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Transcoder for InflateDecoder {
    fn transform(
        &mut self,
        input: &mut InputBuffer<'_>,
        output: &mut dyn ByteSink,
    ) -> Result<Status> {
        loop {
            self.backlog.drain_into(output);
            if !self.backlog.is_empty() {
                return Ok(Status::NeedOutput);
            }
            if self.finished {
                return Ok(Status::Finished);
            }
            if input.is_empty() && !self.more {
                return Ok(Status::NeedInput);
            }
            let (consumed, produced, status) = self.step(input.unread())?;
            input.advance(consumed);
            self.more = produced == self.scratch.len();
            self.backlog.emit(&self.scratch[..produced], output);
            if status == flate2::Status::StreamEnd {
                self.finished = true;
                debug!(
                    "inflate: stream end after {} bytes in, {} bytes out",
                    self.total_in(),
                    self.total_out()
                );
            } else if consumed == 0 && produced == 0 {
                if input.is_empty() {
                    return Ok(Status::NeedInput);
                }
                return Err(CodecError::Inflate("decompressor made no progress".into()));
            }
        }
    }

    fn finalize(&mut self, output: &mut dyn ByteSink) -> Result<()> {
        if !self.finished {
            return Err(CodecError::TruncatedStream);
        }
        self.backlog.drain_into(output);
        ensure_flushed(self.backlog.len())
    }

    fn finishable(&self) -> Option<&dyn Finishable> {
        Some(self)
    }
}

/// Decompress `data` in one call. Bytes after the end of the stream are
/// ignored.
pub fn decompress(data: &[u8], options: DeflateOptions) -> Result<Vec<u8>> {
    crate::transcoder::transcode(&mut InflateDecoder::new(options.framing), data)
}
