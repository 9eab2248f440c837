// Deflate / Inflate transcoders over flate2's raw stream primitives.
//
// - `deflate`: DeflateEncoder: streaming compression, one-shot finalize
// - `inflate`: InflateDecoder: streaming decompression, Finishable
//
// Both speak either bare RFC 1951 deflate (`Framing::Raw`, the form GZIP
// embeds) or the RFC 1950 zlib wrapper (`Framing::Zlib`).

pub mod deflate;
pub mod inflate;

pub use deflate::{DeflateEncoder, compress};
pub use flate2::Compression;
pub use inflate::{InflateDecoder, decompress};

/// Scratch space handed to flate2 per call.
const SCRATCH_SIZE: usize = 32 * 1024;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Stream wrapper around the deflate data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// RFC 1951, no header or trailer.
    #[default]
    Raw,
    /// RFC 1950: 2-byte header and Adler-32 trailer.
    Zlib,
}

impl Framing {
    fn zlib_header(self) -> bool {
        self == Self::Zlib
    }
}

/// Configuration for [`DeflateEncoder`] and [`InflateDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateOptions {
    /// Compression level. Ignored when decompressing.
    pub level: Compression,
    pub framing: Framing,
}

impl Default for DeflateOptions {
    fn default() -> Self {
        Self {
            level: Compression::fast(),
            framing: Framing::Raw,
        }
    }
}

impl DeflateOptions {
    pub fn zlib() -> Self {
        Self {
            framing: Framing::Zlib,
            ..Self::default()
        }
    }
}
