// Base64 (RFC 4648) encoder and decoder.
//
// Encoder: 3 input bytes -> 4 characters. A partial group is only completed
// (with `=` padding) at finalize. Output is wrapped with CRLF at a fixed
// character count, splitting a group across lines when the limit is not a
// multiple of 4.
//
// Decoder: 4 characters -> up to 3 bytes. CR and LF are ignored wherever they
// appear. Padding may only close a group.

use log::debug;

use crate::buffer::{Backlog, ByteSink, InputBuffer};
use crate::transcoder::{CodecError, Result, Status, Transcoder, ensure_flushed};

const STANDARD: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const URL_SAFE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

const PAD: u8 = b'=';
const INVALID: u8 = 0xFF;

/// Default characters per line (MIME).
pub const DEFAULT_LINE_LENGTH: usize = 76;

const fn decode_table(alphabet: &[u8; 64]) -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < 64 {
        table[alphabet[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static STANDARD_DECODE: [u8; 256] = decode_table(STANDARD);
static URL_SAFE_DECODE: [u8; 256] = decode_table(URL_SAFE);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Which 62nd/63rd characters to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alphabet {
    /// `+` and `/`, padded.
    #[default]
    Standard,
    /// `-` and `_`; padding is omitted on encode and optional on decode.
    UrlSafe,
}

impl Alphabet {
    fn encode_table(self) -> &'static [u8; 64] {
        match self {
            Self::Standard => STANDARD,
            Self::UrlSafe => URL_SAFE,
        }
    }

    fn decode_table(self) -> &'static [u8; 256] {
        match self {
            Self::Standard => &STANDARD_DECODE,
            Self::UrlSafe => &URL_SAFE_DECODE,
        }
    }
}

/// Base64 configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base64Options {
    pub alphabet: Alphabet,
    /// Characters per output line before a CRLF is inserted. `None` (or
    /// `Some(0)`) disables wrapping. Ignored by the decoder.
    pub line_length: Option<usize>,
}

impl Default for Base64Options {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::Standard,
            line_length: Some(DEFAULT_LINE_LENGTH),
        }
    }
}

impl Base64Options {
    /// URL-safe alphabet without line wrapping, as used by JWT and friends.
    pub fn url_safe() -> Self {
        Self {
            alphabet: Alphabet::UrlSafe,
            line_length: None,
        }
    }

    /// Standard alphabet on a single line.
    pub fn unwrapped() -> Self {
        Self {
            line_length: None,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Incremental Base64 encoder.
#[derive(Debug)]
pub struct Base64Encoder {
    table: &'static [u8; 64],
    url_safe: bool,
    line_length: Option<usize>,
    group: [u8; 3],
    group_len: usize,
    column: usize,
    backlog: Backlog,
}

impl Base64Encoder {
    pub fn new(options: Base64Options) -> Self {
        Self {
            table: options.alphabet.encode_table(),
            url_safe: options.alphabet == Alphabet::UrlSafe,
            line_length: options.line_length.filter(|&n| n > 0),
            group: [0; 3],
            group_len: 0,
            column: 0,
            backlog: Backlog::new(),
        }
    }

    fn encode_group(&self, len: usize) -> [u8; 4] {
        let [a, b, c] = self.group;
        let b = if len > 1 { b } else { 0 };
        let c = if len > 2 { c } else { 0 };
        let t = self.table;
        [
            t[(a >> 2) as usize],
            t[(((a & 0x03) << 4) | (b >> 4)) as usize],
            if len > 1 { t[(((b & 0x0F) << 2) | (c >> 6)) as usize] } else { PAD },
            if len > 2 { t[(c & 0x3F) as usize] } else { PAD },
        ]
    }

    /// Emit encoded characters, inserting CRLF whenever the line is full.
    fn emit(&mut self, chars: &[u8], output: &mut dyn ByteSink) {
        let mut rest = chars;
        if let Some(limit) = self.line_length {
            while self.column + rest.len() > limit {
                let bp = limit - self.column;
                self.backlog.emit(&rest[..bp], output);
                self.backlog.emit(b"\r\n", output);
                self.column = 0;
                rest = &rest[bp..];
            }
        }
        self.backlog.emit(rest, output);
        self.column += rest.len();
    }

    fn pump(&mut self, input: &mut InputBuffer<'_>, output: &mut dyn ByteSink) -> Status {
        loop {
            self.backlog.drain_into(output);
            if !self.backlog.is_empty() {
                return Status::NeedOutput;
            }
            let Some(byte) = input.next_byte() else {
                return Status::NeedInput;
            };
            self.group[self.group_len] = byte;
            self.group_len += 1;
            if self.group_len == 3 {
                let chars = self.encode_group(3);
                self.group_len = 0;
                self.emit(&chars, output);
            }
        }
    }

    /// Pad and emit a partial group, then drain. Returns bytes still parked.
    fn flush_tail(&mut self, output: &mut dyn ByteSink) -> usize {
        self.backlog.drain_into(output);
        if self.group_len > 0 {
            let chars = self.encode_group(self.group_len);
            let len = if self.url_safe { self.group_len + 1 } else { 4 };
            self.group_len = 0;
            self.emit(&chars[..len], output);
        }
        self.backlog.len()
    }
}

impl Default for Base64Encoder {
    fn default() -> Self {
        Self::new(Base64Options::default())
    }
}

impl Transcoder for Base64Encoder {
    fn transform(
        &mut self,
        input: &mut InputBuffer<'_>,
        output: &mut dyn ByteSink,
    ) -> Result<Status> {
        Ok(self.pump(input, output))
    }

    fn finalize(&mut self, output: &mut dyn ByteSink) -> Result<()> {
        ensure_flushed(self.flush_tail(output))
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Incremental Base64 decoder.
#[derive(Debug)]
pub struct Base64Decoder {
    table: &'static [u8; 256],
    url_safe: bool,
    quad: [u8; 4],
    quad_len: usize,
    padding: usize,
    offset: u64,
    backlog: Backlog,
    failed: bool,
}

impl Base64Decoder {
    pub fn new(options: Base64Options) -> Self {
        Self {
            table: options.alphabet.decode_table(),
            url_safe: options.alphabet == Alphabet::UrlSafe,
            quad: [0; 4],
            quad_len: 0,
            padding: 0,
            offset: 0,
            backlog: Backlog::new(),
            failed: false,
        }
    }

    fn invalid(&self, byte: u8) -> CodecError {
        CodecError::InvalidBase64 {
            byte,
            offset: self.offset,
        }
    }

    /// Accept one encoded character into the current group.
    fn accept(&mut self, byte: u8) -> Result<()> {
        if byte == PAD {
            // Padding may only fill positions 2 and 3, and `=` in position 2
            // must be followed by another.
            if self.quad_len < 2 {
                return Err(self.invalid(byte));
            }
            self.quad[self.quad_len] = 0;
            self.padding += 1;
        } else {
            let value = self.table[byte as usize];
            if value == INVALID || self.padding > 0 {
                return Err(self.invalid(byte));
            }
            self.quad[self.quad_len] = value;
        }
        self.quad_len += 1;
        Ok(())
    }

    fn decode_quad(&mut self, output: &mut dyn ByteSink) {
        let [a, b, c, d] = self.quad.map(u32::from);
        let n = (a << 18) | (b << 12) | (c << 6) | d;
        let bytes = [(n >> 16) as u8, (n >> 8) as u8, n as u8];
        let len = 3 - self.padding;
        self.quad_len = 0;
        self.padding = 0;
        self.backlog.emit(&bytes[..len], output);
    }

    fn pump(&mut self, input: &mut InputBuffer<'_>, output: &mut dyn ByteSink) -> Result<Status> {
        loop {
            self.backlog.drain_into(output);
            if !self.backlog.is_empty() {
                return Ok(Status::NeedOutput);
            }
            let Some(byte) = input.next_byte() else {
                return Ok(Status::NeedInput);
            };
            if byte != b'\r' && byte != b'\n' {
                self.accept(byte)?;
                if self.quad_len == 4 {
                    self.decode_quad(output);
                }
            }
            self.offset += 1;
        }
    }
}

impl Default for Base64Decoder {
    fn default() -> Self {
        Self::new(Base64Options::default())
    }
}

impl Transcoder for Base64Decoder {
    fn transform(
        &mut self,
        input: &mut InputBuffer<'_>,
        output: &mut dyn ByteSink,
    ) -> Result<Status> {
        if self.failed {
            return Err(CodecError::Poisoned);
        }
        self.pump(input, output).inspect_err(|_| self.failed = true)
    }

    fn finalize(&mut self, output: &mut dyn ByteSink) -> Result<()> {
        if self.failed {
            return Err(CodecError::Poisoned);
        }
        if self.quad_len > 0 {
            let missing = 4 - self.quad_len;
            // A single character carries only 6 bits, never a whole byte.
            if !self.url_safe || self.quad_len < 2 {
                return Err(CodecError::IncompleteUnit {
                    unit: "base64 group",
                    missing,
                });
            }
            debug!("base64: synthesizing {missing} padding character(s)");
            for slot in self.quad_len..4 {
                self.quad[slot] = 0;
            }
            self.padding += missing;
            self.decode_quad(output);
        }
        self.backlog.drain_into(output);
        ensure_flushed(self.backlog.len())
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Encode `data` in one call.
pub fn encode(data: &[u8], options: Base64Options) -> Vec<u8> {
    let mut encoder = Base64Encoder::new(options);
    let mut output = Vec::with_capacity(data.len() / 3 * 4 + 4);
    encoder.pump(&mut InputBuffer::new(data), &mut output);
    encoder.flush_tail(&mut output);
    output
}

/// Decode `data` in one call.
pub fn decode(data: &[u8], options: Base64Options) -> Result<Vec<u8>> {
    crate::transcoder::transcode(&mut Base64Decoder::new(options), data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
