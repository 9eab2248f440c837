// std::io adapters that run a Transcoder inside a stream.
//
// - `TranscodedReader`: pulls from an upstream `Read`, yields transcoded bytes
// - `TranscodedWriter`: accepts bytes, pushes transcoded bytes downstream
// - `transcode_stream()`: copy a reader into a writer through a transcoder,
//   with CRC-32 and byte counts of both sides
//
// Both adapters poison themselves after a fatal error: every later call
// fails with `CodecError::Poisoned` (surfaced as `InvalidData`).

use std::io::{self, Read, Write};

use log::{trace, warn};

use crate::buffer::{Backlog, ByteSink, InputBuffer, OutputBuffer};
use crate::checksum::{ChecksumReader, ChecksumWriter};
use crate::transcoder::{CodecError, Status, Transcoder};

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 8 * 1024; // 8 KiB

/// Errors that leave the stream intact and may be retried.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

// ---------------------------------------------------------------------------
// TranscodedReader
// ---------------------------------------------------------------------------

/// Read-through stage: reading from it yields the transcoded form of the
/// upstream bytes.
///
/// EOF is reported once upstream is exhausted (or the transcoder reached its
/// own end) and the finalized output has been fully read.
///
/// # Example
/// ```no_run
/// use oxicodec::codec::Base64Decoder;
/// use oxicodec::io::TranscodedReader;
/// use std::io::Read;
///
/// let mut reader = TranscodedReader::new(&b"aGVsbG8="[..], Base64Decoder::default());
/// let mut decoded = Vec::new();
/// reader.read_to_end(&mut decoded).unwrap();
/// assert_eq!(decoded, b"hello");
/// ```
#[derive(Debug)]
pub struct TranscodedReader<R, T> {
    inner: R,
    transcoder: T,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
    /// Output produced by finalize, handed out over later reads.
    staged: Backlog,
    eof: bool,
    finalized: bool,
    poisoned: bool,
}

impl<R: Read, T: Transcoder> TranscodedReader<R, T> {
    pub fn new(inner: R, transcoder: T) -> Self {
        Self::with_capacity(BUF_SIZE, inner, transcoder)
    }

    /// Use an upstream read buffer of `capacity` bytes (at least 1).
    pub fn with_capacity(capacity: usize, inner: R, transcoder: T) -> Self {
        Self {
            inner,
            transcoder,
            buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
            start: 0,
            end: 0,
            staged: Backlog::new(),
            eof: false,
            finalized: false,
            poisoned: false,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    /// Upstream bytes read but not consumed by the transcoder, e.g. data
    /// following a GZIP member.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        } else if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        if self.end == self.buf.len() {
            return Ok(());
        }
        let n = self.inner.read(&mut self.buf[self.end..])?;
        trace!("reader: pulled {n} bytes upstream");
        if n == 0 {
            self.eof = true;
        }
        self.end += n;
        Ok(())
    }

    fn finalize_once(&mut self) -> io::Result<()> {
        self.finalized = true;
        self.transcoder.finalize(&mut self.staged)?;
        trace!("reader: finalized, {} bytes staged", self.staged.len());
        Ok(())
    }

    fn read_transcoded(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if !self.staged.is_empty() {
                let mut sink = OutputBuffer::new(out);
                self.staged.drain_into(&mut sink);
                return Ok(sink.written());
            }
            if self.finalized {
                return Ok(0);
            }

            let mut input = InputBuffer::new(&self.buf[self.start..self.end]);
            let mut sink = OutputBuffer::new(out);
            let status = self.transcoder.transform(&mut input, &mut sink)?;
            self.start += input.position();
            let written = sink.written();
            if written > 0 {
                trace!("reader: {written} bytes out ({status:?})");
                return Ok(written);
            }
            match status {
                Status::Finished => self.finalize_once()?,
                Status::NeedInput if self.eof => self.finalize_once()?,
                Status::NeedInput => self.fill()?,
                // Parked output; the next transform drains it.
                Status::NeedOutput => {}
            }
        }
    }
}

impl<R: Read, T: Transcoder> Read for TranscodedReader<R, T> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.poisoned {
            return Err(CodecError::Poisoned.into());
        }
        if out.is_empty() {
            return Ok(0);
        }
        self.read_transcoded(out).inspect_err(|e| {
            if !is_transient(e) {
                self.poisoned = true;
            }
        })
    }
}

// ---------------------------------------------------------------------------
// WriterSink
// ---------------------------------------------------------------------------

/// `ByteSink` over a `Write`.
///
/// A hard I/O error is stored and stops the sink; `WouldBlock` only stops it.
struct WriterSink<'a, W> {
    inner: &'a mut W,
    error: Option<io::Error>,
    blocked: bool,
}

impl<'a, W: Write> WriterSink<'a, W> {
    fn new(inner: &'a mut W) -> Self {
        Self {
            inner,
            error: None,
            blocked: false,
        }
    }

    fn into_result(self) -> io::Result<()> {
        self.error.map_or(Ok(()), Err)
    }
}

impl<W: Write> ByteSink for WriterSink<'_, W> {
    fn remaining_space(&self) -> usize {
        if self.error.is_some() || self.blocked {
            0
        } else {
            usize::MAX
        }
    }

    fn put(&mut self, data: &[u8]) -> usize {
        let mut written = 0;
        while written < data.len() && self.error.is_none() && !self.blocked {
            match self.inner.write(&data[written..]) {
                Ok(0) => self.error = Some(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.blocked = true,
                Err(e) => self.error = Some(e),
            }
        }
        written
    }
}

// ---------------------------------------------------------------------------
// TranscodedWriter
// ---------------------------------------------------------------------------

/// Write-through stage: bytes written to it are transcoded into `inner`.
///
/// `flush()` pushes out what the transcoder has ready without ending the
/// stream; `finish()` ends it. Dropping an unfinished writer finishes it on a
/// best-effort basis and logs any failure.
#[derive(Debug)]
pub struct TranscodedWriter<W: Write, T: Transcoder> {
    inner: Option<W>,
    transcoder: T,
    poisoned: bool,
}

impl<W: Write, T: Transcoder> TranscodedWriter<W, T> {
    pub fn new(inner: W, transcoder: T) -> Self {
        Self {
            inner: Some(inner),
            transcoder,
            poisoned: false,
        }
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Finalize the transcoder, flush `inner` and return it.
    pub fn finish(mut self) -> io::Result<W> {
        self.finish_in_place()?;
        self.inner.take().ok_or_else(|| CodecError::Closed.into())
    }

    fn checked(&mut self) -> io::Result<(&mut W, &mut T)> {
        if self.poisoned {
            return Err(CodecError::Poisoned.into());
        }
        match self.inner.as_mut() {
            Some(inner) => Ok((inner, &mut self.transcoder)),
            None => Err(CodecError::Closed.into()),
        }
    }

    fn poison<V>(&mut self, result: io::Result<V>) -> io::Result<V> {
        if let Err(e) = &result
            && !is_transient(e)
        {
            self.poisoned = true;
        }
        result
    }

    fn write_transcoded(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (inner, transcoder) = self.checked()?;
        let mut sink = WriterSink::new(inner);
        let mut input = InputBuffer::new(buf);
        let status = transcoder.transform(&mut input, &mut sink)?;
        let blocked = sink.blocked;
        sink.into_result()?;
        let consumed = input.position();
        trace!("writer: consumed {consumed} of {} bytes ({status:?})", buf.len());
        if consumed == 0 && blocked && !buf.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        Ok(consumed)
    }

    fn flush_transcoded(&mut self) -> io::Result<()> {
        let (inner, transcoder) = self.checked()?;
        let mut sink = WriterSink::new(&mut *inner);
        let status = transcoder.transform(&mut InputBuffer::new(&[]), &mut sink)?;
        let blocked = sink.blocked;
        sink.into_result()?;
        if status == Status::NeedOutput && blocked {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        inner.flush()
    }

    fn finish_in_place(&mut self) -> io::Result<()> {
        let (inner, transcoder) = self.checked()?;
        let mut sink = WriterSink::new(&mut *inner);
        let finalized = transcoder.finalize(&mut sink);
        let written = sink.into_result();
        // Any failure here leaves the stream unusable.
        self.poisoned = true;
        written?;
        finalized?;
        let Some(inner) = self.inner.as_mut() else {
            return Err(CodecError::Closed.into());
        };
        inner.flush()?;
        self.poisoned = false;
        trace!("writer: finished");
        Ok(())
    }
}

impl<W: Write, T: Transcoder> Write for TranscodedWriter<W, T> {
    /// Bytes past the end of a Finishable transcoder's stream are refused
    /// with `CodecError::PastEnd`; the writer can still be finished.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.write_transcoded(buf) {
            Ok(0) if !buf.is_empty() && self.transcoder.reports_finished() => {
                Err(CodecError::PastEnd { bytes: buf.len() }.into())
            }
            result => self.poison(result),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.flush_transcoded();
        self.poison(result)
    }
}

impl<W: Write, T: Transcoder> Drop for TranscodedWriter<W, T> {
    fn drop(&mut self) {
        if self.inner.is_none() || self.poisoned {
            return;
        }
        if let Err(e) = self.finish_in_place() {
            warn!("writer dropped without finish, finalize failed: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// transcode_stream
// ---------------------------------------------------------------------------

/// Statistics returned by `transcode_stream()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Bytes read from the source (may include bytes past a Finishable
    /// transcoder's end).
    pub bytes_in: u64,
    /// Bytes written to the destination.
    pub bytes_out: u64,
    /// CRC-32 of the bytes read.
    pub input_crc32: u32,
    /// CRC-32 of the bytes written.
    pub output_crc32: u32,
}

/// Copy `reader` into `writer` through `transcoder`, then flush the writer.
pub fn transcode_stream<R, W, T>(
    reader: R,
    writer: W,
    transcoder: T,
) -> io::Result<(W, TranscodeStats)>
where
    R: Read,
    W: Write,
    T: Transcoder,
{
    let mut source = TranscodedReader::new(ChecksumReader::new(reader), transcoder);
    let mut dest = ChecksumWriter::new(writer);
    io::copy(&mut source, &mut dest)?;
    dest.flush()?;

    let input = source.get_ref().crc().clone();
    let (writer, output) = dest.into_inner();
    let stats = TranscodeStats {
        bytes_in: input.amount(),
        bytes_out: output.amount(),
        input_crc32: input.value(),
        output_crc32: output.value(),
    };
    Ok((writer, stats))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
