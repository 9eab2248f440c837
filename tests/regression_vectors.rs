#![cfg(feature = "gzip")]

use oxicodec::base64::{self, Base64Options};
use oxicodec::deflate::{self, DeflateOptions};
use oxicodec::quoted_printable::{self, QuotedPrintableProfile};
use oxicodec::xor::XorMask;
use oxicodec::{gzip, transcode};

#[derive(Debug)]
struct Vector {
    name: String,
    codec: String,
    input: Vec<u8>,
    output: Vec<u8>,
}

fn hex_to_bytes(s: &str) -> Vec<u8> {
    let s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }
    assert!(
        s.len().is_multiple_of(2),
        "hex string must have even length"
    );
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

fn load_vectors() -> Vec<Vector> {
    let manifest = include_str!("vectors/manifest.tsv");
    manifest
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| {
            let parts: Vec<_> = line.split('|').collect();
            assert_eq!(parts.len(), 4, "invalid vector row: {line}");
            Vector {
                name: parts[0].to_string(),
                codec: parts[1].to_string(),
                input: hex_to_bytes(parts[2]),
                output: hex_to_bytes(parts[3]),
            }
        })
        .collect()
}

fn qp_profile(codec: &str) -> Option<QuotedPrintableProfile> {
    match codec {
        "qp-default" => Some(QuotedPrintableProfile::Default),
        "qp-text" => Some(QuotedPrintableProfile::Text),
        "qp-word" => Some(QuotedPrintableProfile::Word),
        "qp-all" => Some(QuotedPrintableProfile::All),
        _ => None,
    }
}

fn base64_options(codec: &str) -> Option<Base64Options> {
    match codec {
        "base64" => Some(Base64Options::default()),
        "base64-url" => Some(Base64Options::url_safe()),
        _ => None,
    }
}

/// Returns (encoded, decoded-from-expected) for symmetric codecs, or just the
/// decoded output for decode-only rows.
fn run(v: &Vector) -> (Option<Vec<u8>>, Vec<u8>) {
    if let Some(opts) = base64_options(&v.codec) {
        return (
            Some(base64::encode(&v.input, opts)),
            base64::decode(&v.output, opts).unwrap(),
        );
    }
    if let Some(profile) = qp_profile(&v.codec) {
        return (
            Some(quoted_printable::encode(&v.input, profile)),
            quoted_printable::decode(&v.output, profile).unwrap(),
        );
    }
    if let Some(key) = v.codec.strip_prefix("xor:") {
        let key = hex_to_bytes(key);
        let encoded = transcode(&mut XorMask::new(key.clone()).unwrap(), &v.input).unwrap();
        let decoded = transcode(&mut XorMask::new(key).unwrap(), &v.output).unwrap();
        return (Some(encoded), decoded);
    }
    let decoded = match v.codec.as_str() {
        "gunzip" => gzip::decompress(&v.input).unwrap(),
        "inflate-zlib" => deflate::decompress(&v.input, DeflateOptions::zlib()).unwrap(),
        "inflate-raw" => deflate::decompress(&v.input, DeflateOptions::default()).unwrap(),
        other => panic!("unknown codec {other} in vector {}", v.name),
    };
    (None, decoded)
}

#[test]
fn vector_database_is_non_empty() {
    let vectors = load_vectors();
    assert!(!vectors.is_empty());
}

#[test]
fn encoders_match_all_vectors() {
    for v in load_vectors() {
        if let (Some(encoded), _) = run(&v) {
            assert_eq!(encoded, v.output, "vector {}", v.name);
        }
    }
}

#[test]
fn decoders_match_all_vectors() {
    for v in load_vectors() {
        let (encoded, decoded) = run(&v);
        if encoded.is_some() {
            assert_eq!(decoded, v.input, "vector {}", v.name);
        } else {
            assert_eq!(decoded, v.output, "vector {}", v.name);
        }
    }
}

#[test]
fn long_base64_wraps_into_four_lines() {
    let v = load_vectors()
        .into_iter()
        .find(|v| v.name == "base64-long-wrapped")
        .unwrap();
    let lines: Vec<&[u8]> = v.output.split(|&b| b == b'\n').collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[..3].iter().all(|line| line.len() == 77));
    assert_eq!(lines[3], b"IHdlIHdpbGwgaGl0IHRoYXQh");
}
