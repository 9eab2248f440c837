#![no_main]
use libfuzzer_sys::fuzz_target;
use oxicodec::base64::{self, Base64Options};
use oxicodec::deflate::{self, DeflateOptions};
use oxicodec::gzip;
use oxicodec::quoted_printable::{self, QuotedPrintableProfile};

fuzz_target!(|data: &[u8]| {
    // Decoders must never panic on arbitrary bytes, only return errors.
    let _ = base64::decode(data, Base64Options::default());
    let _ = base64::decode(data, Base64Options::url_safe());
    for profile in [
        QuotedPrintableProfile::Default,
        QuotedPrintableProfile::Text,
        QuotedPrintableProfile::Word,
        QuotedPrintableProfile::All,
    ] {
        let _ = quoted_printable::decode(data, profile);
    }
    let _ = gzip::decompress(data);
    let _ = deflate::decompress(data, DeflateOptions::default());
    let _ = deflate::decompress(data, DeflateOptions::zlib());
});
