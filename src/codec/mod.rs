// Text and masking codecs.
//
// - `base64`: RFC 4648 Base64, standard and URL-safe alphabets
// - `quoted_printable`: RFC 2045 bodies and RFC 2047 header profiles
// - `xor`: repeating-key XOR mask

pub mod base64;
pub mod quoted_printable;
pub mod xor;

pub use base64::{Alphabet, Base64Decoder, Base64Encoder, Base64Options};
pub use quoted_printable::{QuotedPrintableDecoder, QuotedPrintableEncoder, QuotedPrintableProfile};
pub use xor::XorMask;
