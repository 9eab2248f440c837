#![no_main]
use libfuzzer_sys::fuzz_target;
use oxicodec::gzip::{GzipDecoder, GzipFlags, GzipHeader};
use oxicodec::{InputBuffer, Transcoder};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Build a header with fuzzed optional fields, then feed it back one byte
    // at a time followed by the rest of the input as "compressed data".
    let split = data.len() / 2;
    let (fields, tail) = data.split_at(split);
    let header = GzipHeader {
        flags: GzipFlags::from_bits_truncate(data[0]) & GzipFlags::FHCRC,
        mtime: u32::from(data[1]),
        extra: (data[0] & 4 != 0).then(|| fields.to_vec()),
        filename: Some(fields.iter().copied().filter(|&b| b != 0).collect()),
        comment: (data[0] & 16 != 0).then(|| b"fuzz".to_vec()),
        ..GzipHeader::default()
    };
    let mut stream = header.to_bytes();
    stream.extend_from_slice(tail);

    let mut decoder = GzipDecoder::new();
    let mut out = Vec::new();
    for byte in stream.chunks(1) {
        let mut input = InputBuffer::new(byte);
        if decoder.transform(&mut input, &mut out).is_err() {
            return;
        }
    }
    if let Some(parsed) = decoder.header() {
        assert_eq!(parsed.filename, header.filename);
        assert_eq!(parsed.extra, header.extra);
    }
});
