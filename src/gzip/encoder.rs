// GZIP member writer: header, raw deflate body, CRC32 + ISIZE footer.

use log::debug;

use super::header::GzipHeader;
use crate::buffer::{Backlog, ByteSink, InputBuffer};
use crate::checksum::Crc32;
use crate::compress::{Compression, DeflateEncoder, DeflateOptions, Framing};
use crate::transcoder::{CodecError, Result, Status, Transcoder, ensure_flushed};

/// Incremental GZIP compressor producing a single member.
///
/// # Example
/// ```no_run
/// use oxicodec::gzip::GzipEncoder;
/// use oxicodec::io::TranscodedWriter;
/// use std::io::Write;
///
/// let mut writer = TranscodedWriter::new(Vec::new(), GzipEncoder::default());
/// writer.write_all(b"hello").unwrap();
/// let gz = writer.finish().unwrap();
/// ```
#[derive(Debug)]
pub struct GzipEncoder {
    deflate: DeflateEncoder,
    crc: Crc32,
    /// Header before any data, footer after finalize.
    backlog: Backlog,
    closed: bool,
}

impl GzipEncoder {
    pub fn new(level: Compression) -> Self {
        Self::with_header(level, &GzipHeader::default())
    }

    /// Write `header` instead of the minimal one.
    pub fn with_header(level: Compression, header: &GzipHeader) -> Self {
        let options = DeflateOptions {
            level,
            framing: Framing::Raw,
        };
        Self {
            deflate: DeflateEncoder::new(options),
            crc: Crc32::new(),
            backlog: Backlog::from_bytes(&header.to_bytes()),
            closed: false,
        }
    }

    /// Uncompressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.crc.amount()
    }

    /// CRC-32 of the uncompressed bytes consumed so far.
    pub fn checksum(&self) -> u32 {
        self.crc.value()
    }
}

impl Default for GzipEncoder {
    fn default() -> Self {
        Self::new(Compression::fast())
    }
}

impl Transcoder for GzipEncoder {
    fn transform(
        &mut self,
        input: &mut InputBuffer<'_>,
        output: &mut dyn ByteSink,
    ) -> Result<Status> {
        if self.closed && !input.is_empty() {
            return Err(CodecError::Closed);
        }
        self.backlog.drain_into(output);
        if !self.backlog.is_empty() {
            return Ok(Status::NeedOutput);
        }
        let unread = input.unread();
        let status = self.deflate.transform(input, output)?;
        self.crc.update(&unread[..unread.len() - input.remaining()]);
        Ok(status)
    }

    fn finalize(&mut self, output: &mut dyn ByteSink) -> Result<()> {
        if !self.closed {
            self.deflate.finalize(&mut self.backlog)?;
            self.backlog.extend(&self.crc.value().to_le_bytes());
            self.backlog.extend(&(self.crc.amount() as u32).to_le_bytes());
            self.closed = true;
            debug!(
                "gzip: footer written, crc {:#010X}, {} bytes in",
                self.crc.value(),
                self.crc.amount()
            );
        }
        self.backlog.drain_into(output);
        ensure_flushed(self.backlog.len())
    }
}

/// Compress `data` into a single GZIP member.
pub fn compress(data: &[u8], level: Compression) -> Result<Vec<u8>> {
    crate::transcoder::transcode(&mut GzipEncoder::new(level), data)
}
