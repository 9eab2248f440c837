// Bounded byte buffers shared by every transcoder.
//
// Transcoders never own the bytes they are handed, nor the space they write
// into. What they see is:
//
// - `InputBuffer`: a read cursor over borrowed bytes ("remaining data")
// - `ByteSink`: anything that accepts bytes, possibly fewer than offered
//   ("remaining space")
// - `OutputBuffer`: the fixed-capacity sink over a caller-provided slice
// - `Backlog`: the retain buffer a transcoder parks output in while the
//   sink is full

// ---------------------------------------------------------------------------
// InputBuffer
// ---------------------------------------------------------------------------

/// Read cursor over a borrowed byte slice.
///
/// A transcoder advances the cursor past every byte it has taken ownership
/// of; whatever is left unread after a call belongs to the caller again.
#[derive(Debug, Clone)]
pub struct InputBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> InputBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Number of bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The unconsumed tail. Borrowed for `'a`, not for the cursor's lifetime.
    #[inline]
    pub fn unread(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Mark `n` bytes as consumed (clamped to what is left).
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n.min(self.remaining());
    }

    /// Consume a single byte.
    #[inline]
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Consume up to `n` bytes and return them.
    pub fn take(&mut self, n: usize) -> &'a [u8] {
        let n = n.min(self.remaining());
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        out
    }
}

// ---------------------------------------------------------------------------
// ByteSink
// ---------------------------------------------------------------------------

/// A destination for transformed bytes.
///
/// `put` may accept fewer bytes than offered (a short write); the caller keeps
/// the rest. Accepting zero bytes is the normal "output full" signal, not an
/// error.
pub trait ByteSink {
    /// Space currently available. Unbounded sinks report `usize::MAX`.
    fn remaining_space(&self) -> usize;

    /// Offer `data`; returns how many leading bytes were accepted.
    fn put(&mut self, data: &[u8]) -> usize;
}

impl ByteSink for Vec<u8> {
    fn remaining_space(&self) -> usize {
        usize::MAX
    }

    fn put(&mut self, data: &[u8]) -> usize {
        self.extend_from_slice(data);
        data.len()
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn remaining_space(&self) -> usize {
        (**self).remaining_space()
    }

    fn put(&mut self, data: &[u8]) -> usize {
        (**self).put(data)
    }
}

// ---------------------------------------------------------------------------
// OutputBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity sink writing into a caller-provided slice.
#[derive(Debug)]
pub struct OutputBuffer<'a> {
    buf: &'a mut [u8],
    filled: usize,
}

impl<'a> OutputBuffer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, filled: 0 }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn written(&self) -> usize {
        self.filled
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.filled == self.buf.len()
    }

    /// The bytes written so far.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.filled]
    }
}

impl ByteSink for OutputBuffer<'_> {
    fn remaining_space(&self) -> usize {
        self.buf.len() - self.filled
    }

    fn put(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.remaining_space());
        self.buf[self.filled..self.filled + n].copy_from_slice(&data[..n]);
        self.filled += n;
        n
    }
}

// ---------------------------------------------------------------------------
// Backlog
// ---------------------------------------------------------------------------

/// Produced-but-undelivered bytes, drained front to back.
#[derive(Debug, Default)]
pub(crate) struct Backlog {
    buf: Vec<u8>,
    start: usize,
}

impl Backlog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            buf: bytes.to_vec(),
            start: 0,
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.start == self.buf.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    #[inline]
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Move as much as the sink accepts. Returns the number of bytes moved.
    pub(crate) fn drain_into(&mut self, sink: &mut dyn ByteSink) -> usize {
        if self.is_empty() {
            return 0;
        }
        let n = sink.put(&self.buf[self.start..]);
        self.start += n;
        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        }
        n
    }

    /// Push `bytes` to the sink directly, parking whatever it refuses.
    ///
    /// Bytes already parked go first, so ordering is preserved.
    pub(crate) fn emit(&mut self, bytes: &[u8], sink: &mut dyn ByteSink) {
        if self.is_empty() {
            let n = sink.put(bytes);
            self.buf.extend_from_slice(&bytes[n..]);
        } else {
            self.buf.extend_from_slice(bytes);
            self.drain_into(sink);
        }
    }
}

impl ByteSink for Backlog {
    fn remaining_space(&self) -> usize {
        usize::MAX
    }

    fn put(&mut self, data: &[u8]) -> usize {
        self.buf.extend_from_slice(data);
        data.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_cursor_advances() {
        let mut input = InputBuffer::new(b"abcdef");
        assert_eq!(input.next_byte(), Some(b'a'));
        assert_eq!(input.take(2), b"bc");
        assert_eq!(input.remaining(), 3);
        input.advance(10);
        assert!(input.is_empty());
        assert_eq!(input.position(), 6);
        assert_eq!(input.next_byte(), None);
    }

    #[test]
    fn output_buffer_short_write() {
        let mut storage = [0u8; 4];
        let mut out = OutputBuffer::new(&mut storage);
        assert_eq!(out.put(b"abc"), 3);
        assert_eq!(out.put(b"def"), 1);
        assert!(out.is_full());
        assert_eq!(out.put(b"g"), 0);
        assert_eq!(out.filled(), b"abcd");
    }

    #[test]
    fn backlog_preserves_order_across_short_sinks() {
        let mut backlog = Backlog::new();
        let mut storage = [0u8; 2];
        let mut out = OutputBuffer::new(&mut storage);
        backlog.emit(b"hello", &mut out);
        assert_eq!(out.filled(), b"he");
        assert_eq!(backlog.len(), 3);

        let mut rest = Vec::new();
        backlog.emit(b"!", &mut rest);
        assert_eq!(rest, b"llo!");
        assert!(backlog.is_empty());
    }
}
