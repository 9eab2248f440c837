#![no_main]
use libfuzzer_sys::fuzz_target;
use oxicodec::base64::{self, Alphabet, Base64Options};
use oxicodec::deflate::Compression;
use oxicodec::gzip;
use oxicodec::quoted_printable::{self, QuotedPrintableProfile};
use oxicodec::xor::XorMask;
use oxicodec::transcode;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the options.
    let flags = data[0];
    let payload = &data[1..];

    let opts = Base64Options {
        alphabet: if flags & 1 != 0 { Alphabet::UrlSafe } else { Alphabet::Standard },
        line_length: Some(usize::from(flags >> 2)),
    };
    let encoded = base64::encode(payload, opts);
    assert_eq!(base64::decode(&encoded, opts).unwrap(), payload);

    let profile = match flags & 0b11 {
        0 => QuotedPrintableProfile::Default,
        1 => QuotedPrintableProfile::Text,
        2 => QuotedPrintableProfile::Word,
        _ => QuotedPrintableProfile::All,
    };
    let encoded = quoted_printable::encode(payload, profile);
    assert_eq!(quoted_printable::decode(&encoded, profile).unwrap(), payload);

    let level = Compression::new(u32::from(flags % 10));
    let gz = gzip::compress(payload, level).unwrap();
    assert_eq!(gzip::decompress(&gz).unwrap(), payload);

    let key = [flags, 0x5A, !flags];
    let masked = transcode(&mut XorMask::new(key).unwrap(), payload).unwrap();
    assert_eq!(transcode(&mut XorMask::new(key).unwrap(), &masked).unwrap(), payload);
});
