// CRC-32 pass-through containers.
//
// Every byte that travels through one of these wrappers is fed into a
// running CRC-32 (IEEE, as used by GZIP) and counted. The wrappers never
// alter the bytes, so they can be slotted into any read or write path to
// verify a stream while it is being produced or consumed.
//
// - `Crc32`: the accumulator itself (value + byte count)
// - `ChecksumReader`: `Read` wrapper
// - `ChecksumWriter`: `Write` wrapper
// - `ChecksumSink`: `ByteSink` wrapper, used by the GZIP decoder

use std::io::{self, Read, Write};

use crc32fast::Hasher;

use crate::buffer::ByteSink;

// ---------------------------------------------------------------------------
// Crc32
// ---------------------------------------------------------------------------

/// Running CRC-32 plus the number of bytes it covers.
#[derive(Clone, Default)]
pub struct Crc32 {
    hasher: Hasher,
    amount: u64,
}

impl Crc32 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.amount += bytes.len() as u64;
    }

    /// Checksum of everything seen since creation or the last reset.
    pub fn value(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Number of bytes seen since creation or the last reset.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn reset(&mut self) {
        self.hasher.reset();
        self.amount = 0;
    }
}

impl std::fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32")
            .field("value", &format_args!("{:#010X}", self.value()))
            .field("amount", &self.amount)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ChecksumReader
// ---------------------------------------------------------------------------

/// `Read` wrapper that checksums every byte read through it.
#[derive(Debug)]
pub struct ChecksumReader<R> {
    inner: R,
    crc: Crc32,
}

impl<R: Read> ChecksumReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_crc(inner, Crc32::new())
    }

    /// Continue an existing accumulator.
    pub fn with_crc(inner: R, crc: Crc32) -> Self {
        Self { inner, crc }
    }

    pub fn checksum(&self) -> u32 {
        self.crc.value()
    }

    /// Total bytes read through this wrapper.
    pub fn amount_read(&self) -> u64 {
        self.crc.amount()
    }

    pub fn crc(&self) -> &Crc32 {
        &self.crc
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> (R, Crc32) {
        (self.inner, self.crc)
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.crc.update(&buf[..n]);
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// ChecksumWriter
// ---------------------------------------------------------------------------

/// `Write` wrapper that checksums every byte the inner writer accepted.
#[derive(Debug)]
pub struct ChecksumWriter<W> {
    inner: W,
    crc: Crc32,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_crc(inner, Crc32::new())
    }

    pub fn with_crc(inner: W, crc: Crc32) -> Self {
        Self { inner, crc }
    }

    pub fn checksum(&self) -> u32 {
        self.crc.value()
    }

    /// Total bytes the inner writer accepted.
    pub fn amount_written(&self) -> u64 {
        self.crc.amount()
    }

    pub fn crc(&self) -> &Crc32 {
        &self.crc
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> (W, Crc32) {
        (self.inner, self.crc)
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.crc.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// ChecksumSink
// ---------------------------------------------------------------------------

/// `ByteSink` wrapper over a borrowed accumulator.
pub struct ChecksumSink<'a> {
    inner: &'a mut dyn ByteSink,
    crc: &'a mut Crc32,
}

impl<'a> ChecksumSink<'a> {
    pub fn new(inner: &'a mut dyn ByteSink, crc: &'a mut Crc32) -> Self {
        Self { inner, crc }
    }
}

impl ByteSink for ChecksumSink<'_> {
    fn remaining_space(&self) -> usize {
        self.inner.remaining_space()
    }

    fn put(&mut self, data: &[u8]) -> usize {
        let n = self.inner.put(data);
        self.crc.update(&data[..n]);
        n
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
