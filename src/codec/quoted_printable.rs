// Quoted-Printable (RFC 2045 / RFC 2047) encoder and decoder.
//
// The profile decides which printable bytes are escaped, how long an encoded
// line may get before a soft break (`=` CRLF), and whether spaces travel as
// `_` (the RFC 2047 "Q" form used in headers).
//
// Control bytes (< 0x20, CR and LF included) and bytes >= 0x7F are always
// escaped, so the only line breaks in encoded output are soft ones.

use log::{debug, warn};

use crate::buffer::{Backlog, ByteSink, InputBuffer};
use crate::transcoder::{CodecError, Result, Status, Transcoder, ensure_flushed};

const HEX: &[u8; 16] = b"0123456789ABCDEF";
const SOFT_BREAK: &[u8] = b"=\r\n";

const TEXT_ESCAPES: &[u8] = b"\r\n=_?";
const WORD_ESCAPES: &[u8] = b"\r\n=_?\"#$%&'(),.:;<>@[\\]^`{|}~";
const ALL_ESCAPES: &[u8] = b"\r\n=_?\"#$%&'(),.:;<>@[\\]^`{|}~/!\t*+";

const fn escape_table(set: &[u8]) -> [bool; 256] {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i < 0x20 || i >= 0x7F;
        i += 1;
    }
    let mut j = 0;
    while j < set.len() {
        table[set[j] as usize] = true;
        j += 1;
    }
    table
}

static DEFAULT_TABLE: [bool; 256] = escape_table(b"\r\n=");
static TEXT_TABLE: [bool; 256] = escape_table(TEXT_ESCAPES);
static WORD_TABLE: [bool; 256] = escape_table(WORD_ESCAPES);
static ALL_TABLE: [bool; 256] = escape_table(ALL_ESCAPES);

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Escaping profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuotedPrintableProfile {
    /// Body encoding: escapes `=`, 76-character lines, literal spaces.
    #[default]
    Default,
    /// Header text: also escapes `_` and `?`, spaces as `_`, no line limit.
    Text,
    /// Header words: additionally escapes most punctuation.
    Word,
    /// Word plus `/ ! \t * +`.
    All,
}

impl QuotedPrintableProfile {
    fn escapes(self) -> &'static [bool; 256] {
        match self {
            Self::Default => &DEFAULT_TABLE,
            Self::Text => &TEXT_TABLE,
            Self::Word => &WORD_TABLE,
            Self::All => &ALL_TABLE,
        }
    }

    /// Maximum encoded line length including the soft-break `=`.
    pub fn line_length(self) -> Option<usize> {
        match self {
            Self::Default => Some(76),
            _ => None,
        }
    }

    /// Whether a space is written as `_`.
    pub fn encodes_spaces(self) -> bool {
        self != Self::Default
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Incremental Quoted-Printable encoder.
#[derive(Debug)]
pub struct QuotedPrintableEncoder {
    escapes: &'static [bool; 256],
    encode_spaces: bool,
    /// Content characters allowed before a soft break.
    limit: usize,
    column: usize,
    /// Spaces held back until the next byte shows whether they end a line.
    spaces: usize,
    has_encoded: bool,
    backlog: Backlog,
}

impl QuotedPrintableEncoder {
    pub fn new(profile: QuotedPrintableProfile) -> Self {
        Self {
            escapes: profile.escapes(),
            encode_spaces: profile.encodes_spaces(),
            limit: profile.line_length().map_or(usize::MAX, |n| n - 1),
            column: 0,
            spaces: 0,
            has_encoded: false,
            backlog: Backlog::new(),
        }
    }

    /// Whether any byte has been escaped so far.
    pub fn has_encoded(&self) -> bool {
        self.has_encoded
    }

    /// A full line only gets its soft break once more content follows.
    fn literal(&mut self, byte: u8, output: &mut dyn ByteSink) {
        if self.column >= self.limit {
            self.soft_break(output);
        }
        self.backlog.emit(&[byte], output);
        self.column += 1;
    }

    fn escaped(&mut self, byte: u8, output: &mut dyn ByteSink) {
        self.has_encoded = true;
        if self.column + 3 > self.limit {
            self.soft_break(output);
        }
        self.literal(b'=', output);
        self.literal(HEX[(byte >> 4) as usize], output);
        self.literal(HEX[(byte & 0x0F) as usize], output);
    }

    fn soft_break(&mut self, output: &mut dyn ByteSink) {
        self.backlog.emit(SOFT_BREAK, output);
        self.column = 0;
    }

    fn release_spaces(&mut self, escape: bool, output: &mut dyn ByteSink) {
        for _ in 0..std::mem::take(&mut self.spaces) {
            if escape {
                self.escaped(b' ', output);
            } else {
                self.literal(b' ', output);
            }
        }
    }

    fn encode_byte(&mut self, byte: u8, output: &mut dyn ByteSink) {
        if self.spaces > 0 && byte != b' ' {
            let ends_line = byte == b'\r' || byte == b'\n';
            self.release_spaces(ends_line, output);
        }
        if self.escapes[byte as usize] {
            self.escaped(byte, output);
        } else if byte == b' ' {
            if self.encode_spaces {
                self.literal(b'_', output);
            } else {
                self.spaces += 1;
            }
        } else {
            self.literal(byte, output);
        }
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
            self.encode_byte(byte, output);
        }
    }

    fn flush_tail(&mut self, output: &mut dyn ByteSink) -> usize {
        self.backlog.drain_into(output);
        self.release_spaces(true, output);
        self.backlog.len()
    }
}

impl Default for QuotedPrintableEncoder {
    fn default() -> Self {
        Self::new(QuotedPrintableProfile::Default)
    }
}

impl Transcoder for QuotedPrintableEncoder {
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

/// Position inside an `=` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    Equals,
    /// First hex digit seen.
    High(u8),
    /// `=` CR seen, expecting LF.
    Cr,
}

/// Incremental Quoted-Printable decoder.
#[derive(Debug)]
pub struct QuotedPrintableDecoder {
    encode_spaces: bool,
    escape: Escape,
    spaces: usize,
    backlog: Backlog,
    failed: bool,
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

impl QuotedPrintableDecoder {
    pub fn new(profile: QuotedPrintableProfile) -> Self {
        Self {
            encode_spaces: profile.encodes_spaces(),
            escape: Escape::None,
            spaces: 0,
            backlog: Backlog::new(),
            failed: false,
        }
    }

    fn decode_byte(&mut self, byte: u8, output: &mut dyn ByteSink) -> Result<()> {
        match self.escape {
            Escape::Equals => {
                self.escape = match byte {
                    b'\n' => Escape::None,
                    b'\r' => Escape::Cr,
                    _ => Escape::High(hex_value(byte).ok_or(CodecError::InvalidEscape { byte })?),
                };
            }
            Escape::High(high) => {
                let low = hex_value(byte).ok_or(CodecError::InvalidEscape { byte })?;
                self.backlog.emit(&[(high << 4) | low], output);
                self.escape = Escape::None;
            }
            Escape::Cr => {
                if byte != b'\n' {
                    warn!("quoted-printable: malformed soft line break, keeping {byte:#04X}");
                    self.backlog.emit(&[byte], output);
                }
                self.escape = Escape::None;
            }
            Escape::None => {
                if byte == b' ' {
                    self.spaces += 1;
                    return Ok(());
                }
                if self.spaces > 0 {
                    let spaces = std::mem::take(&mut self.spaces);
                    // Trailing whitespace before a line break is transport padding.
                    if byte != b'\r' && byte != b'\n' {
                        for _ in 0..spaces {
                            self.backlog.emit(b" ", output);
                        }
                    }
                }
                match byte {
                    b'=' => self.escape = Escape::Equals,
                    b'_' if self.encode_spaces => self.backlog.emit(b" ", output),
                    _ => self.backlog.emit(&[byte], output),
                }
            }
        }
        Ok(())
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
            self.decode_byte(byte, output)?;
        }
    }
}

impl Default for QuotedPrintableDecoder {
    fn default() -> Self {
        Self::new(QuotedPrintableProfile::Default)
    }
}

impl Transcoder for QuotedPrintableDecoder {
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
        let missing = match std::mem::replace(&mut self.escape, Escape::None) {
            Escape::Equals => 2,
            Escape::High(_) => 1,
            Escape::None | Escape::Cr => 0,
        };
        if missing > 0 {
            return Err(CodecError::IncompleteUnit {
                unit: "quoted-printable escape",
                missing,
            });
        }
        if self.spaces > 0 {
            debug!("quoted-printable: dropping {} trailing space(s)", self.spaces);
            self.spaces = 0;
        }
        self.backlog.drain_into(output);
        ensure_flushed(self.backlog.len())
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Encode `data` in one call.
pub fn encode(data: &[u8], profile: QuotedPrintableProfile) -> Vec<u8> {
    let mut encoder = QuotedPrintableEncoder::new(profile);
    let mut output = Vec::with_capacity(data.len() + data.len() / 4);
    encoder.pump(&mut InputBuffer::new(data), &mut output);
    encoder.flush_tail(&mut output);
    output
}

/// Decode `data` in one call.
pub fn decode(data: &[u8], profile: QuotedPrintableProfile) -> Result<Vec<u8>> {
    crate::transcoder::transcode(&mut QuotedPrintableDecoder::new(profile), data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
