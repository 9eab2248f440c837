// RFC 1952 member header.
//
// +---+---+---+---+---+---+---+---+---+---+
// |ID1|ID2|CM |FLG|     MTIME     |XFL|OS |
// +---+---+---+---+---+---+---+---+---+---+
// (if FEXTRA)   XLEN (LE u16), XLEN bytes
// (if FNAME)    original file name, NUL-terminated
// (if FCOMMENT) comment, NUL-terminated
// (if FHCRC)    CRC16 (low half of the CRC-32 of everything above)

use crate::checksum::Crc32;

/// ID1 ID2.
pub const MAGIC: [u8; 2] = [0x1F, 0x8B];

/// CM value for deflate, the only method RFC 1952 defines.
pub const CM_DEFLATE: u8 = 8;

/// Length of the mandatory part of the header.
pub const FIXED_HEADER_LEN: usize = 10;

/// CRC32 + ISIZE.
pub const FOOTER_LEN: usize = 8;

bitflags::bitflags! {
    /// FLG byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GzipFlags: u8 {
        /// Payload is probably ASCII text.
        const FTEXT = 0x01;
        /// A CRC16 of the header precedes the compressed data.
        const FHCRC = 0x02;
        const FEXTRA = 0x04;
        const FNAME = 0x08;
        const FCOMMENT = 0x10;
    }
}

/// Parsed (or to-be-written) header fields.
///
/// The default value is the minimal header: no optional fields and zero
/// MTIME, XFL and OS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GzipHeader {
    /// FLG as read. When writing, FEXTRA/FNAME/FCOMMENT follow the optional
    /// fields below; FTEXT and FHCRC are taken from here.
    pub flags: GzipFlags,
    /// Modification time, seconds since the epoch (0 = unknown).
    pub mtime: u32,
    pub xfl: u8,
    pub os: u8,
    pub extra: Option<Vec<u8>>,
    /// Original file name, without the terminating NUL. ISO 8859-1 on the
    /// wire; kept as raw bytes.
    pub filename: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
}

impl GzipHeader {
    /// Header with an original file name.
    pub fn with_filename(name: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: Some(name.into()),
            ..Self::default()
        }
    }

    /// FLG byte this header serializes with.
    pub fn wire_flags(&self) -> GzipFlags {
        let mut flags = self.flags & (GzipFlags::FTEXT | GzipFlags::FHCRC);
        flags.set(GzipFlags::FEXTRA, self.extra.is_some());
        flags.set(GzipFlags::FNAME, self.filename.is_some());
        flags.set(GzipFlags::FCOMMENT, self.comment.is_some());
        flags
    }

    /// Serialize. Names and comments are cut at an embedded NUL and the extra
    /// field at 65535 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let flags = self.wire_flags();
        let mut out = Vec::with_capacity(FIXED_HEADER_LEN);
        out.extend_from_slice(&MAGIC);
        out.push(CM_DEFLATE);
        out.push(flags.bits());
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.push(self.xfl);
        out.push(self.os);
        if let Some(extra) = &self.extra {
            let len = extra.len().min(u16::MAX as usize);
            out.extend_from_slice(&(len as u16).to_le_bytes());
            out.extend_from_slice(&extra[..len]);
        }
        for field in [&self.filename, &self.comment].into_iter().flatten() {
            out.extend(field.iter().take_while(|&&b| b != 0));
            out.push(0);
        }
        if flags.contains(GzipFlags::FHCRC) {
            let mut crc = Crc32::new();
            crc.update(&out);
            out.extend_from_slice(&(crc.value() as u16).to_le_bytes());
        }
        out
    }
}
