// Integration tests for the codecs through the public API.
//
// Covers windowed driving (tiny input chunks, tiny output windows), the
// read/write adapters, chained pipelines (gzip inside base64), and the
// error each malformed stream is expected to surface.

#![cfg(feature = "gzip")]

use std::io::{self, Read, Write};

use oxicodec::base64::{Base64Decoder, Base64Encoder, Base64Options};
use oxicodec::deflate::{DeflateEncoder, DeflateOptions, InflateDecoder};
use oxicodec::gzip::{GzipDecoder, GzipEncoder};
use oxicodec::io::{TranscodedReader, TranscodedWriter, transcode_stream};
use oxicodec::quoted_printable::{
    QuotedPrintableDecoder, QuotedPrintableEncoder, QuotedPrintableProfile,
};
use oxicodec::xor::XorMask;
use oxicodec::{CodecError, InputBuffer, OutputBuffer, Status, Transcoder, transcode};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TEXT: &[u8] =
    b"testing this much longer this that could trigger some sort of an error with small buffer edge cases";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn generate_data(size: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    let mut data = Vec::with_capacity(size);
    for _ in 0..size {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        data.push((state >> 33) as u8);
    }
    data
}

/// Feed `data` in `chunk`-byte slices through a `window`-byte output buffer.
fn drive<T: Transcoder>(
    transcoder: &mut T,
    data: &[u8],
    chunk: usize,
    window: usize,
) -> oxicodec::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut scratch = vec![0u8; window];
    'feed: for piece in data.chunks(chunk) {
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

fn codec_error(err: &io::Error) -> &CodecError {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<CodecError>())
        .unwrap_or_else(|| panic!("not a codec error: {err}"))
}

fn read_all<T: Transcoder>(data: &[u8], transcoder: T) -> io::Result<Vec<u8>> {
    let mut reader = TranscodedReader::new(data, transcoder);
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Windowed driving
// ---------------------------------------------------------------------------

#[test]
fn every_encoder_is_window_independent() {
    init_logger();
    let data = TEXT.repeat(4);
    let options = [Base64Options::default(), Base64Options::url_safe()];
    for opts in options {
        let expected = transcode(&mut Base64Encoder::new(opts), &data).unwrap();
        for window in 1..=20 {
            let got = drive(&mut Base64Encoder::new(opts), &data, 7, window).unwrap();
            assert_eq!(got, expected, "base64 window={window}");
        }
    }
    for profile in [
        QuotedPrintableProfile::Default,
        QuotedPrintableProfile::Text,
        QuotedPrintableProfile::Word,
        QuotedPrintableProfile::All,
    ] {
        let expected = transcode(&mut QuotedPrintableEncoder::new(profile), &data).unwrap();
        for window in 1..=20 {
            let got = drive(&mut QuotedPrintableEncoder::new(profile), &data, 5, window).unwrap();
            assert_eq!(got, expected, "{profile:?} window={window}");
        }
    }
}

#[test]
fn every_decoder_is_chunk_independent() {
    init_logger();
    let data = generate_data(2000, 7);
    let b64 = oxicodec::base64::encode(&data, Base64Options::default());
    let qp = oxicodec::quoted_printable::encode(&data, QuotedPrintableProfile::Default);
    let gz = oxicodec::gzip::compress(&data, Default::default()).unwrap();
    for chunk in [1, 2, 3, 13, 64] {
        for window in [1, 3, 20] {
            let got = drive(&mut Base64Decoder::default(), &b64, chunk, window).unwrap();
            assert_eq!(got, data, "base64 chunk={chunk} window={window}");
            let got = drive(&mut QuotedPrintableDecoder::default(), &qp, chunk, window).unwrap();
            assert_eq!(got, data, "qp chunk={chunk} window={window}");
            let got = drive(&mut GzipDecoder::new(), &gz, chunk, window).unwrap();
            assert_eq!(got, data, "gzip chunk={chunk} window={window}");
        }
    }
}

#[test]
fn deflate_windowed_output_inflates_back() {
    for opts in [DeflateOptions::default(), DeflateOptions::zlib()] {
        let data = TEXT.repeat(30);
        let packed = drive(&mut DeflateEncoder::new(opts), &data, 11, 3).unwrap();
        let unpacked = drive(&mut InflateDecoder::new(opts.framing), &packed, 5, 2).unwrap();
        assert_eq!(unpacked, data, "{:?}", opts.framing);
    }
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

#[test]
fn writer_then_reader_roundtrip() {
    let data = generate_data(10_000, 42);
    let mut writer = TranscodedWriter::new(Vec::new(), GzipEncoder::default());
    for piece in data.chunks(333) {
        writer.write_all(piece).unwrap();
    }
    let gz = writer.finish().unwrap();

    assert_eq!(read_all(&gz, GzipDecoder::new()).unwrap(), data);
}

#[test]
fn chained_writers_gzip_inside_base64() {
    init_logger();
    let inner = TranscodedWriter::new(Vec::new(), Base64Encoder::default());
    let mut outer = TranscodedWriter::new(inner, GzipEncoder::default());
    outer.write_all(&TEXT.repeat(20)).unwrap();
    let inner = outer.finish().unwrap();
    let armored = inner.finish().unwrap();

    assert!(armored.iter().all(|b| b.is_ascii()));
    assert!(armored.windows(2).any(|w| w == b"\r\n"));

    let base = TranscodedReader::new(&armored[..], Base64Decoder::default());
    let mut reader = TranscodedReader::new(base, GzipDecoder::new());
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, TEXT.repeat(20));
}

#[test]
fn boxed_transcoders_mix_in_one_pipeline() {
    let stages: Vec<Box<dyn Transcoder>> = vec![
        Box::new(XorMask::new("key").unwrap()),
        Box::new(QuotedPrintableEncoder::default()),
    ];
    let mut data = TEXT.to_vec();
    for mut stage in stages {
        data = transcode(&mut stage, &data).unwrap();
    }
    let unquoted = oxicodec::quoted_printable::decode(&data, QuotedPrintableProfile::Default).unwrap();
    let plain = transcode(&mut XorMask::new("key").unwrap(), &unquoted).unwrap();
    assert_eq!(plain, TEXT);
}

#[test]
fn reader_stops_at_gzip_member_end() {
    let mut gz = oxicodec::gzip::compress(TEXT, Default::default()).unwrap();
    gz.extend_from_slice(b"trailing garbage");
    let mut reader = TranscodedReader::new(&gz[..], GzipDecoder::new());
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, TEXT);
    assert!(reader.transcoder().reports_finished());
}

#[test]
fn transcode_stream_reports_checksums() {
    let (gz, stats) = transcode_stream(TEXT, Vec::new(), GzipEncoder::default()).unwrap();
    assert_eq!(stats.bytes_in, TEXT.len() as u64);
    assert_eq!(stats.bytes_out, gz.len() as u64);
    assert_eq!(stats.input_crc32, crc32fast::hash(TEXT));

    // The gzip footer carries the same CRC-32 as the input.
    let footer = &gz[gz.len() - 8..];
    let crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    assert_eq!(crc, stats.input_crc32);

    let (plain, back) = transcode_stream(&gz[..], Vec::new(), GzipDecoder::new()).unwrap();
    assert_eq!(plain, TEXT);
    assert_eq!(back.output_crc32, stats.input_crc32);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn flipped_footer_crc_is_reported() {
    let mut gz = oxicodec::gzip::compress(TEXT, Default::default()).unwrap();
    let at = gz.len() - 8;
    gz[at] ^= 0xFF;
    let err = read_all(&gz, GzipDecoder::new()).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    assert!(matches!(
        codec_error(&err),
        CodecError::ChecksumMismatch { .. }
    ));
}

#[test]
fn wrong_size_is_reported() {
    let mut gz = oxicodec::gzip::compress(TEXT, Default::default()).unwrap();
    let at = gz.len() - 4;
    gz[at] ^= 0x01;
    let err = oxicodec::gzip::decompress(&gz).unwrap_err();
    assert!(matches!(err, CodecError::SizeMismatch { .. }));
}

#[test]
fn wrong_magic_is_reported_early() {
    let err = read_all(b"PK\x03\x04", GzipDecoder::new()).unwrap_err();
    match codec_error(&err) {
        CodecError::BadMagic { found } => assert_eq!(found, b"PK"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn truncated_streams_are_reported() {
    let err = read_all(b"dGVzd", Base64Decoder::default()).unwrap_err();
    assert!(matches!(
        codec_error(&err),
        CodecError::IncompleteUnit { missing: 3, .. }
    ));

    let gz = oxicodec::gzip::compress(&TEXT.repeat(10), Default::default()).unwrap();
    let err = read_all(&gz[..gz.len() / 2], GzipDecoder::new()).unwrap_err();
    assert!(matches!(codec_error(&err), CodecError::TruncatedStream));

    let err = read_all(&gz[..gz.len() - 3], GzipDecoder::new()).unwrap_err();
    assert!(matches!(
        codec_error(&err),
        CodecError::IncompleteUnit { missing: 3, .. }
    ));
}

#[test]
fn corrupt_deflate_data_is_reported() {
    let err = oxicodec::deflate::decompress(b"\xFF\xFF\xFF\xFF", DeflateOptions::default())
        .unwrap_err();
    assert!(matches!(err, CodecError::Inflate(_)));
}

#[test]
fn invalid_escape_is_reported() {
    let err = read_all(b"abc=G0", QuotedPrintableDecoder::default()).unwrap_err();
    assert!(matches!(
        codec_error(&err),
        CodecError::InvalidEscape { byte: b'G' }
    ));
}

#[test]
fn failed_reader_stays_failed() {
    let mut reader = TranscodedReader::new(&b"AAAA*AAA"[..], Base64Decoder::default());
    let mut out = Vec::new();
    assert!(reader.read_to_end(&mut out).is_err());
    assert!(reader.is_poisoned());
    let err = reader.read(&mut [0u8; 8]).unwrap_err();
    assert!(matches!(codec_error(&err), CodecError::Poisoned));
}
