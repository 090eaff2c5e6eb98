//! Character string codecs for literal strings on the wire.
//!
//! Encoded character strings carry a two-bit discriminator selecting UTF-8,
//! UTF-16BE, a restricted alphabet, or an encoding algorithm. This module
//! holds the two plain text codecs; the other two live in [`crate::alphabet`]
//! and [`crate::algorithm`].

use encoding::all::UTF_16BE;
use encoding::{DecoderTrap, EncoderTrap, Encoding};
use snafu::{Backtrace, ResultExt, Snafu};

/// Module-level error type:
/// for text encoding and decoding issues.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Literal string is not valid UTF-8"))]
    DecodeUtf8 {
        source: std::str::Utf8Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Literal string is not valid UTF-16BE: {}", message))]
    DecodeUtf16 {
        message: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Text cannot be encoded as UTF-16BE: {}", message))]
    EncodeUtf16 {
        message: String,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Decode a UTF-8 octet run into a string.
pub fn decode_utf8(octets: &[u8]) -> Result<String> {
    Ok(std::str::from_utf8(octets)
        .context(DecodeUtf8Snafu)?
        .to_owned())
}

/// Decode a UTF-16BE octet run into a string.
pub fn decode_utf16be(octets: &[u8]) -> Result<String> {
    UTF_16BE
        .decode(octets, DecoderTrap::Strict)
        .map_err(|message| {
            DecodeUtf16Snafu {
                message: message.into_owned(),
            }
            .build()
        })
}

/// Encode a string as UTF-16BE octets.
pub fn encode_utf16be(text: &str) -> Result<Vec<u8>> {
    UTF_16BE
        .encode(text, EncoderTrap::Strict)
        .map_err(|message| {
            EncodeUtf16Snafu {
                message: message.into_owned(),
            }
            .build()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16be_round_trip() {
        let text = "Ação ß";
        let octets = encode_utf16be(text).unwrap();
        assert_eq!(octets.len(), text.chars().count() * 2);
        assert_eq!(decode_utf16be(&octets).unwrap(), text);
    }

    #[test]
    fn truncated_utf16_is_rejected() {
        let octets = encode_utf16be("ab").unwrap();
        assert!(decode_utf16be(&octets[..3]).is_err());
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(matches!(
            decode_utf8(&[0xC3, 0x28]),
            Err(Error::DecodeUtf8 { .. })
        ));
    }
}
