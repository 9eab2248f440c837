//! Oxicodec: incremental, resumable stream codecs in Rust.
//!
//! Every codec is a [`Transcoder`]: a state machine that is fed bytes a piece
//! at a time, writes as much as its destination can take, and parks the rest
//! until the next call. Nothing requires the whole payload in memory, and no
//! call ever blocks waiting for a complete unit.
//!
//! The crate provides:
//! - The transcoder contract and bounded buffers (`transcoder`, `buffer`)
//! - Base64, Quoted-Printable and XOR (`codec`)
//! - Deflate / Inflate over flate2 (`compress`, `deflate` feature)
//! - GZIP framing per RFC 1952 (`gzip`, `gzip` feature)
//! - CRC-32 pass-through readers, writers and sinks (`checksum`)
//! - `std::io` read-through and write-through adapters (`io`)
//!
//! # Quick Start
//!
//! ```no_run
//! use oxicodec::codec::{Base64Decoder, Base64Encoder};
//! use oxicodec::io::{TranscodedReader, TranscodedWriter};
//! use std::io::{Read, Write};
//!
//! let mut writer = TranscodedWriter::new(Vec::new(), Base64Encoder::default());
//! writer.write_all(b"hello world").unwrap();
//! let encoded = writer.finish().unwrap();
//! assert_eq!(encoded, b"aGVsbG8gd29ybGQ=");
//!
//! let mut reader = TranscodedReader::new(&encoded[..], Base64Decoder::default());
//! let mut decoded = Vec::new();
//! reader.read_to_end(&mut decoded).unwrap();
//! assert_eq!(decoded, b"hello world");
//! ```

pub mod buffer;
pub mod checksum;
pub mod codec;
pub mod io;
pub mod transcoder;

#[cfg(feature = "deflate")]
pub mod compress;

#[cfg(feature = "gzip")]
pub mod gzip;

pub use buffer::{ByteSink, InputBuffer, OutputBuffer};
pub use codec::{base64, quoted_printable, xor};
pub use transcoder::{CodecError, Finishable, Result, Status, Transcoder, transcode};

/// `deflate::compress` / `deflate::decompress` and friends.
#[cfg(feature = "deflate")]
pub use compress as deflate;
