// GZIP member reader.
//
// State machine: Header -> Data -> Footer -> Done, with Failed as the sink
// for any fatal error. Each header field is its own step so a header split
// across arbitrarily small reads is parsed without losing partial state.
//
// The CRC accumulator covers the header bytes while the header is parsed
// (for FHCRC) and is reset before the first decompressed byte.

use log::debug;

use super::header::{CM_DEFLATE, FIXED_HEADER_LEN, FOOTER_LEN, GzipFlags, GzipHeader, MAGIC};
use crate::buffer::{ByteSink, InputBuffer};
use crate::checksum::{ChecksumSink, Crc32};
use crate::compress::{Framing, InflateDecoder};
use crate::transcoder::{CodecError, Finishable, Result, Status, Transcoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderStep {
    Fixed,
    ExtraLen,
    Extra { remaining: usize },
    Name,
    Comment,
    Crc,
}

impl HeaderStep {
    /// Optional steps that may follow this one, in wire order.
    fn successors(self) -> &'static [HeaderStep] {
        use HeaderStep::*;
        match self {
            Fixed => &[ExtraLen, Name, Comment, Crc],
            ExtraLen | Extra { .. } => &[Name, Comment, Crc],
            Name => &[Comment, Crc],
            Comment => &[Crc],
            Crc => &[],
        }
    }

    fn flag(self) -> GzipFlags {
        match self {
            Self::Fixed => GzipFlags::empty(),
            Self::ExtraLen | Self::Extra { .. } => GzipFlags::FEXTRA,
            Self::Name => GzipFlags::FNAME,
            Self::Comment => GzipFlags::FCOMMENT,
            Self::Crc => GzipFlags::FHCRC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header(HeaderStep),
    Data,
    Footer,
    Done,
    Failed,
}

/// Incremental GZIP decompressor for a single member.
///
/// Bytes after the member's footer are left unconsumed.
#[derive(Debug)]
pub struct GzipDecoder {
    state: State,
    inflate: InflateDecoder,
    crc: Crc32,
    /// Fixed-size unit being assembled (fixed header, XLEN, CRC16, footer).
    unit: Vec<u8>,
    header: GzipHeader,
    header_done: bool,
}

impl Default for GzipDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl GzipDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Header(HeaderStep::Fixed),
            inflate: InflateDecoder::new(Framing::Raw),
            crc: Crc32::new(),
            unit: Vec::with_capacity(FIXED_HEADER_LEN),
            header: GzipHeader::default(),
            header_done: false,
        }
    }

    /// The member header, once it has been fully parsed.
    pub fn header(&self) -> Option<&GzipHeader> {
        self.header_done.then_some(&self.header)
    }

    /// Decompressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.inflate.total_out()
    }

    /// Move up to `len - unit.len()` bytes into `unit`. True once complete.
    fn fill_unit(&mut self, input: &mut InputBuffer<'_>, len: usize, checksum: bool) -> bool {
        let taken = input.take(len - self.unit.len());
        if checksum {
            self.crc.update(taken);
        }
        self.unit.extend_from_slice(taken);
        self.unit.len() == len
    }

    fn next_step(&self, after: HeaderStep) -> State {
        after
            .successors()
            .iter()
            .copied()
            .find(|step| self.header.flags.contains(step.flag()))
            .map_or(State::Data, State::Header)
    }

    /// Read a NUL-terminated field. True once the terminator was consumed.
    fn read_zstring(&mut self, input: &mut InputBuffer<'_>, field: fn(&mut GzipHeader) -> &mut Vec<u8>) -> bool {
        let unread = input.unread();
        let (len, done) = match unread.iter().position(|&b| b == 0) {
            Some(nul) => (nul + 1, true),
            None => (unread.len(), false),
        };
        let taken = input.take(len);
        self.crc.update(taken);
        let text = if done { &taken[..len - 1] } else { taken };
        field(&mut self.header).extend_from_slice(text);
        done
    }

    /// Advance the header by one step. False when more input is needed.
    fn parse_header(&mut self, step: HeaderStep, input: &mut InputBuffer<'_>) -> Result<bool> {
        match step {
            HeaderStep::Fixed => {
                let complete = self.fill_unit(input, FIXED_HEADER_LEN, true);
                let unit = &self.unit;
                if unit.len() >= 2 && unit[..2] != MAGIC {
                    return Err(CodecError::BadMagic {
                        found: [unit[0], unit[1]],
                    });
                }
                if unit.len() >= 3 && unit[2] != CM_DEFLATE {
                    return Err(CodecError::UnsupportedMethod(unit[2]));
                }
                if !complete {
                    return Ok(false);
                }
                let flags = GzipFlags::from_bits_retain(unit[3]);
                if flags.bits() & !GzipFlags::all().bits() != 0 {
                    debug!("gzip: ignoring reserved flag bits {:#04X}", flags.bits());
                }
                self.header.flags = flags;
                self.header.mtime = u32::from_le_bytes([unit[4], unit[5], unit[6], unit[7]]);
                self.header.xfl = unit[8];
                self.header.os = unit[9];
                self.unit.clear();
                self.state = self.next_step(step);
            }
            HeaderStep::ExtraLen => {
                if !self.fill_unit(input, 2, true) {
                    return Ok(false);
                }
                let remaining = u16::from_le_bytes([self.unit[0], self.unit[1]]) as usize;
                self.unit.clear();
                self.header.extra = Some(Vec::with_capacity(remaining));
                self.state = State::Header(HeaderStep::Extra { remaining });
            }
            HeaderStep::Extra { remaining } => {
                let taken = input.take(remaining);
                self.crc.update(taken);
                self.header.extra.get_or_insert_with(Vec::new).extend_from_slice(taken);
                let remaining = remaining - taken.len();
                if remaining > 0 {
                    self.state = State::Header(HeaderStep::Extra { remaining });
                    return Ok(false);
                }
                self.state = self.next_step(step);
            }
            HeaderStep::Name => {
                if !self.read_zstring(input, |h| h.filename.get_or_insert_with(Vec::new)) {
                    return Ok(false);
                }
                self.state = self.next_step(step);
            }
            HeaderStep::Comment => {
                if !self.read_zstring(input, |h| h.comment.get_or_insert_with(Vec::new)) {
                    return Ok(false);
                }
                self.state = self.next_step(step);
            }
            HeaderStep::Crc => {
                if !self.fill_unit(input, 2, false) {
                    return Ok(false);
                }
                let expected = u16::from_le_bytes([self.unit[0], self.unit[1]]);
                let actual = self.crc.value() as u16;
                if expected != actual {
                    return Err(CodecError::HeaderChecksumMismatch { expected, actual });
                }
                self.unit.clear();
                self.state = State::Data;
            }
        }
        if self.state == State::Data {
            self.header_done = true;
            self.crc.reset();
            debug!("gzip: header parsed: {:?}", self.header);
        }
        Ok(true)
    }

    fn verify_footer(&mut self) -> Result<()> {
        let u = &self.unit;
        let expected_crc = u32::from_le_bytes([u[0], u[1], u[2], u[3]]);
        let expected_size = u32::from_le_bytes([u[4], u[5], u[6], u[7]]);
        let actual_crc = self.crc.value();
        if expected_crc != actual_crc {
            return Err(CodecError::ChecksumMismatch {
                expected: expected_crc,
                actual: actual_crc,
            });
        }
        let actual_size = self.crc.amount() as u32;
        if expected_size != actual_size {
            return Err(CodecError::SizeMismatch {
                expected: expected_size,
                actual: actual_size,
            });
        }
        debug!("gzip: footer verified, {} bytes", self.crc.amount());
        Ok(())
    }

    fn run(&mut self, input: &mut InputBuffer<'_>, output: &mut dyn ByteSink) -> Result<Status> {
        loop {
            match self.state {
                State::Header(step) => {
                    if !self.parse_header(step, input)? {
                        return Ok(Status::NeedInput);
                    }
                }
                State::Data => {
                    let mut sink = ChecksumSink::new(output, &mut self.crc);
                    match self.inflate.transform(input, &mut sink)? {
                        Status::Finished => self.state = State::Footer,
                        other => return Ok(other),
                    }
                }
                State::Footer => {
                    if !self.fill_unit(input, FOOTER_LEN, false) {
                        return Ok(Status::NeedInput);
                    }
                    self.verify_footer()?;
                    self.unit.clear();
                    self.state = State::Done;
                }
                State::Done => return Ok(Status::Finished),
                State::Failed => return Err(CodecError::Poisoned),
            }
        }
    }
}

impl Finishable for GzipDecoder {
    fn is_finished(&self) -> bool {
        self.state == State::Done
    }
}

impl Transcoder for GzipDecoder {
    fn transform(
        &mut self,
        input: &mut InputBuffer<'_>,
        output: &mut dyn ByteSink,
    ) -> Result<Status> {
        self.run(input, output).inspect_err(|_| self.state = State::Failed)
    }

    fn finalize(&mut self, _output: &mut dyn ByteSink) -> Result<()> {
        match self.state {
            State::Done => Ok(()),
            State::Failed => Err(CodecError::Poisoned),
            State::Header(HeaderStep::Fixed) => Err(CodecError::IncompleteUnit {
                unit: "gzip header",
                missing: FIXED_HEADER_LEN - self.unit.len(),
            }),
            State::Footer => Err(CodecError::IncompleteUnit {
                unit: "gzip footer",
                missing: FOOTER_LEN - self.unit.len(),
            }),
            State::Header(_) | State::Data => Err(CodecError::TruncatedStream),
        }
    }

    fn finishable(&self) -> Option<&dyn Finishable> {
        Some(self)
    }
}

/// Decompress a single GZIP member. Bytes after its footer are ignored.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    crate::transcoder::transcode(&mut GzipDecoder::new(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::Compression;
    use crate::gzip::encoder::compress;
    use crate::transcoder::transcode_windowed;

    const TEXT: &[u8] =
        b"testing this much longer this that could trigger some sort of an error with small buffer edge cases";

    #[test]
    fn round_trip() {
        let gz = compress(TEXT, Compression::fast()).unwrap();
        assert_eq!(decompress(&gz).unwrap(), TEXT);
    }

    #[test]
    fn byte_at_a_time_with_small_windows() {
        let data = TEXT.repeat(50);
        let gz = compress(&data, Compression::best()).unwrap();
        for window in [1, 2, 5, 20] {
            let mut decoder = GzipDecoder::new();
            let out = transcode_windowed(&mut decoder, &gz, 1, window).unwrap();
            assert_eq!(out, data, "window {window}");
            assert!(decoder.is_finished());
        }
    }

    #[test]
    fn parses_optional_header_fields() {
        let header = GzipHeader {
            flags: GzipFlags::FHCRC | GzipFlags::FTEXT,
            mtime: 1_700_000_000,
            os: 3,
            extra: Some(b"AB\x02\x00xy".to_vec()),
            filename: Some(b"notes.txt".to_vec()),
            comment: Some(b"a comment".to_vec()),
            ..GzipHeader::default()
        };
        let mut encoder = crate::gzip::GzipEncoder::with_header(Compression::fast(), &header);
        let gz = crate::transcoder::transcode(&mut encoder, TEXT).unwrap();

        let mut decoder = GzipDecoder::new();
        let out = transcode_windowed(&mut decoder, &gz, 3, 8).unwrap();
        assert_eq!(out, TEXT);
        let parsed = decoder.header().unwrap();
        assert_eq!(parsed.flags, header.wire_flags());
        assert_eq!(parsed.mtime, header.mtime);
        assert_eq!(parsed.os, 3);
        assert_eq!(parsed.extra, header.extra);
        assert_eq!(parsed.filename, header.filename);
        assert_eq!(parsed.comment, header.comment);
    }

    #[test]
    fn header_crc_mismatch_is_fatal() {
        let header = GzipHeader {
            flags: GzipFlags::FHCRC,
            ..GzipHeader::default()
        };
        let mut gz = crate::transcoder::transcode(
            &mut crate::gzip::GzipEncoder::with_header(Compression::fast(), &header),
            TEXT,
        )
        .unwrap();
        gz[FIXED_HEADER_LEN] ^= 0xFF;
        assert!(matches!(
            decompress(&gz),
            Err(CodecError::HeaderChecksumMismatch { .. })
        ));
    }

    #[test]
    fn bad_magic_fails_early() {
        let mut decoder = GzipDecoder::new();
        let mut out = Vec::new();
        let err = decoder
            .transform(&mut InputBuffer::new(b"PK"), &mut out)
            .unwrap_err();
        assert!(matches!(err, CodecError::BadMagic { found: [b'P', b'K'] }));
        assert!(matches!(
            decoder.transform(&mut InputBuffer::new(b""), &mut out),
            Err(CodecError::Poisoned)
        ));
    }

    #[test]
    fn failed_header_is_not_exposed() {
        let header = GzipHeader {
            flags: GzipFlags::FHCRC,
            ..GzipHeader::with_filename("partial")
        };
        let mut gz = crate::transcoder::transcode(
            &mut crate::gzip::GzipEncoder::with_header(Compression::fast(), &header),
            TEXT,
        )
        .unwrap();
        let crc_at = FIXED_HEADER_LEN + b"partial\0".len();
        gz[crc_at] ^= 0xFF;

        let mut decoder = GzipDecoder::new();
        let err = decoder
            .transform(&mut InputBuffer::new(&gz), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, CodecError::HeaderChecksumMismatch { .. }));
        assert!(decoder.header().is_none());
    }

    #[test]
    fn header_survives_a_later_failure() {
        let mut gz = compress(TEXT, Compression::fast()).unwrap();
        let n = gz.len();
        gz[n - 8] ^= 0x01;

        let mut decoder = GzipDecoder::new();
        assert!(crate::transcoder::transcode(&mut decoder, &gz).is_err());
        assert!(decoder.header().is_some());
    }

    #[test]
    fn unsupported_method() {
        let err = decompress(&[0x1F, 0x8B, 0x07, 0, 0, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedMethod(7)));
    }

    #[test]
    fn footer_mismatches() {
        let gz = compress(TEXT, Compression::fast()).unwrap();
        let n = gz.len();

        let mut bad_crc = gz.clone();
        bad_crc[n - 8] ^= 0x01;
        assert!(matches!(
            decompress(&bad_crc),
            Err(CodecError::ChecksumMismatch { .. })
        ));

        let mut bad_size = gz.clone();
        bad_size[n - 4] ^= 0x01;
        assert!(matches!(
            decompress(&bad_size),
            Err(CodecError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn truncation_is_reported_per_state() {
        let gz = compress(TEXT, Compression::fast()).unwrap();
        assert!(matches!(
            decompress(&gz[..4]),
            Err(CodecError::IncompleteUnit { missing: 6, .. })
        ));
        assert!(matches!(
            decompress(&gz[..FIXED_HEADER_LEN + 3]),
            Err(CodecError::TruncatedStream)
        ));
        assert!(matches!(
            decompress(&gz[..gz.len() - 3]),
            Err(CodecError::IncompleteUnit { missing: 3, .. })
        ));
    }

    #[test]
    fn trailing_bytes_after_footer_stay_unconsumed() {
        let mut gz = compress(TEXT, Compression::fast()).unwrap();
        let end = gz.len();
        gz.extend_from_slice(b"next");

        let mut decoder = GzipDecoder::new();
        let mut input = InputBuffer::new(&gz);
        let mut out = Vec::new();
        assert_eq!(decoder.transform(&mut input, &mut out).unwrap(), Status::Finished);
        assert_eq!(input.position(), end);
        decoder.finalize(&mut out).unwrap();
        assert_eq!(out, TEXT);
    }
}
