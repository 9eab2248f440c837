// GZIP (RFC 1952) framing around raw deflate.
//
// - `header`: FLG bits, header fields and the header writer
// - `encoder`: GzipEncoder: header + deflate + CRC32/ISIZE footer
// - `decoder`: GzipDecoder: resumable header parser, inflate, footer check

pub mod decoder;
pub mod encoder;
pub mod header;

pub use decoder::{GzipDecoder, decompress};
pub use encoder::{GzipEncoder, compress};
pub use header::{GzipFlags, GzipHeader};
