// Repeating-key XOR mask (e.g. WebSocket frame masking).
//
// The key position carries across calls, so splitting the input differently
// never changes the output. Applying the same mask twice restores the input.

use crate::buffer::{Backlog, ByteSink, InputBuffer};
use crate::transcoder::{CodecError, Result, Status, Transcoder, ensure_flushed};

const CHUNK: usize = 4096;

/// Incremental repeating-key XOR.
#[derive(Debug)]
pub struct XorMask {
    key: Vec<u8>,
    index: u64,
    backlog: Backlog,
}

impl XorMask {
    pub fn new(key: impl Into<Vec<u8>>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(CodecError::EmptyKey);
        }
        Ok(Self {
            key,
            index: 0,
            backlog: Backlog::new(),
        })
    }

    /// Bytes masked so far.
    pub fn position(&self) -> u64 {
        self.index
    }

    fn apply(&mut self, data: &[u8], out: &mut [u8]) {
        let len = self.key.len() as u64;
        for (dst, &src) in out.iter_mut().zip(data) {
            *dst = src ^ self.key[(self.index % len) as usize];
            self.index += 1;
        }
    }
}

impl Transcoder for XorMask {
    fn transform(
        &mut self,
        input: &mut InputBuffer<'_>,
        output: &mut dyn ByteSink,
    ) -> Result<Status> {
        let mut scratch = [0u8; CHUNK];
        loop {
            self.backlog.drain_into(output);
            if !self.backlog.is_empty() {
                return Ok(Status::NeedOutput);
            }
            if input.is_empty() {
                return Ok(Status::NeedInput);
            }
            let space = output.remaining_space();
            if space == 0 {
                return Ok(Status::NeedOutput);
            }
            let chunk = input.take(space.min(CHUNK));
            let masked = &mut scratch[..chunk.len()];
            self.apply(chunk, masked);
            self.backlog.emit(masked, output);
        }
    }

    fn finalize(&mut self, output: &mut dyn ByteSink) -> Result<()> {
        self.backlog.drain_into(output);
        ensure_flushed(self.backlog.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcoder::{transcode, transcode_windowed};

    #[test]
    fn mask_is_an_involution() {
        let plain = b"haha this is a test";
        let masked = transcode(&mut XorMask::new("test").unwrap(), plain).unwrap();
        assert_ne!(&masked[..], plain);
        assert_eq!(&masked[..4], &[b'h' ^ b't', b'a' ^ b'e', b'h' ^ b's', b'a' ^ b't']);
        let back = transcode(&mut XorMask::new("test").unwrap(), &masked).unwrap();
        assert_eq!(back, plain);
    }

    #[test]
    fn key_index_survives_call_boundaries() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let expected = transcode(&mut XorMask::new(vec![1, 2, 3]).unwrap(), &data).unwrap();
        for window in [1, 2, 5, 17] {
            let mut mask = XorMask::new(vec![1, 2, 3]).unwrap();
            let out = transcode_windowed(&mut mask, &data, 7, window).unwrap();
            assert_eq!(out, expected);
            assert_eq!(mask.position(), 10_000);
        }
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(XorMask::new(Vec::new()), Err(CodecError::EmptyKey)));
    }
}
