//! The ten built-in encoding algorithms of X.891.

use super::{
    DecodeUtf8Snafu, EncodingAlgorithm, InvalidHexSnafu, InvalidOctetLengthSnafu,
    InvalidPadCountSnafu, ParseBooleanSnafu, ParseFloatSnafu, ParseIntegerSnafu, ReadValueSnafu,
    Result, WriteValueSnafu,
};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use byteordered::ByteOrdered;
use snafu::{ensure, ResultExt};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_value(c: char) -> Result<u8> {
    match c.to_digit(16) {
        Some(digit) => Ok(digit as u8),
        None => InvalidHexSnafu {
            message: format!("unexpected character {:?}", c),
        }
        .fail(),
    }
}

fn push_separated(out: &mut String, first: bool, token: &str) {
    if !first {
        out.push(' ');
    }
    out.push_str(token);
}

/// Octets rendered as uppercase hexadecimal, two characters per octet.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct HexAlgorithm;

impl EncodingAlgorithm for HexAlgorithm {
    fn octets_from_string(&self, text: &str) -> Result<Vec<u8>> {
        let digits: Vec<char> = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        ensure!(
            digits.len() % 2 == 0,
            InvalidHexSnafu {
                message: format!("odd number of digits ({})", digits.len()),
            }
        );
        let mut out = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks_exact(2) {
            out.push(hex_value(pair[0])? << 4 | hex_value(pair[1])?);
        }
        Ok(out)
    }

    fn string_from_octets(&self, octets: &[u8], out: &mut String) -> Result<()> {
        out.reserve(octets.len() * 2);
        for &octet in octets {
            out.push(HEX_DIGITS[usize::from(octet >> 4)] as char);
            out.push(HEX_DIGITS[usize::from(octet & 0x0F)] as char);
        }
        Ok(())
    }
}

/// Octets rendered as standard base64.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Base64Algorithm;

impl EncodingAlgorithm for Base64Algorithm {
    fn octets_from_string(&self, text: &str) -> Result<Vec<u8>> {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        BASE64_STANDARD
            .decode(compact.as_bytes())
            .context(super::InvalidBase64Snafu)
    }

    fn string_from_octets(&self, octets: &[u8], out: &mut String) -> Result<()> {
        out.push_str(&BASE64_STANDARD.encode(octets));
        Ok(())
    }
}

macro_rules! integer_algorithm {
    ($name:ident, $doc:expr, $label:expr, $ty:ty, $width:expr, $read:ident, $write:ident) => {
        #[doc = $doc]
        #[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
        pub struct $name;

        impl EncodingAlgorithm for $name {
            fn octets_from_string(&self, text: &str) -> Result<Vec<u8>> {
                let mut out = Vec::new();
                {
                    let mut writer = ByteOrdered::be(&mut out);
                    for token in text.split_whitespace() {
                        let value: $ty = token.parse().context(ParseIntegerSnafu { token })?;
                        writer.$write(value).context(WriteValueSnafu)?;
                    }
                }
                Ok(out)
            }

            fn string_from_octets(&self, octets: &[u8], out: &mut String) -> Result<()> {
                ensure!(
                    octets.len() % $width == 0,
                    InvalidOctetLengthSnafu {
                        algorithm: $label,
                        length: octets.len(),
                    }
                );
                let mut reader = ByteOrdered::be(octets);
                for i in 0..octets.len() / $width {
                    let value = reader.$read().context(ReadValueSnafu)?;
                    push_separated(out, i == 0, &value.to_string());
                }
                Ok(())
            }
        }
    };
}

integer_algorithm!(
    ShortAlgorithm,
    "16-bit big-endian signed integers, space-separated decimals.",
    "short",
    i16,
    2,
    read_i16,
    write_i16
);
integer_algorithm!(
    IntAlgorithm,
    "32-bit big-endian signed integers, space-separated decimals.",
    "int",
    i32,
    4,
    read_i32,
    write_i32
);
integer_algorithm!(
    LongAlgorithm,
    "64-bit big-endian signed integers, space-separated decimals.",
    "long",
    i64,
    8,
    read_i64,
    write_i64
);

macro_rules! float_algorithm {
    ($name:ident, $doc:expr, $label:expr, $ty:ty, $width:expr, $read:ident, $write:ident) => {
        #[doc = $doc]
        #[derive(Debug, Default, Copy, Clone, PartialEq)]
        pub struct $name;

        impl EncodingAlgorithm for $name {
            fn octets_from_string(&self, text: &str) -> Result<Vec<u8>> {
                let mut out = Vec::new();
                {
                    let mut writer = ByteOrdered::be(&mut out);
                    for token in text.split_whitespace() {
                        let value: $ty = token.parse().context(ParseFloatSnafu { token })?;
                        writer.$write(value).context(WriteValueSnafu)?;
                    }
                }
                Ok(out)
            }

            fn string_from_octets(&self, octets: &[u8], out: &mut String) -> Result<()> {
                ensure!(
                    octets.len() % $width == 0,
                    InvalidOctetLengthSnafu {
                        algorithm: $label,
                        length: octets.len(),
                    }
                );
                let mut reader = ByteOrdered::be(octets);
                for i in 0..octets.len() / $width {
                    let value = reader.$read().context(ReadValueSnafu)?;
                    push_separated(out, i == 0, &value.to_string());
                }
                Ok(())
            }
        }
    };
}

float_algorithm!(
    FloatAlgorithm,
    "32-bit IEEE 754 big-endian values, space-separated decimals.",
    "float",
    f32,
    4,
    read_f32,
    write_f32
);
float_algorithm!(
    DoubleAlgorithm,
    "64-bit IEEE 754 big-endian values, space-separated decimals.",
    "double",
    f64,
    8,
    read_f64,
    write_f64
);

/// Bit-packed booleans. The first four bits of the payload state how many
/// trailing bits of the last octet are padding; the remaining bits follow
/// MSB-first, one per value.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct BooleanAlgorithm;

impl EncodingAlgorithm for BooleanAlgorithm {
    fn octets_from_string(&self, text: &str) -> Result<Vec<u8>> {
        let mut values = Vec::new();
        for token in text.split_whitespace() {
            match token {
                "true" => values.push(true),
                "false" => values.push(false),
                _ => return ParseBooleanSnafu { token }.fail(),
            }
        }
        let total = 4 + values.len() as u32;
        let pad = (8 - total % 8) % 8;
        let mut out = Vec::with_capacity(((total + pad) / 8) as usize);
        let mut accumulator = u32::from(pad);
        let mut pending = 4u32;
        for value in values {
            accumulator = (accumulator << 1) | u32::from(value);
            pending += 1;
            if pending == 8 {
                out.push(accumulator as u8);
                accumulator = 0;
                pending = 0;
            }
        }
        if pending > 0 {
            out.push((accumulator << (8 - pending)) as u8);
        }
        Ok(out)
    }

    fn string_from_octets(&self, octets: &[u8], out: &mut String) -> Result<()> {
        ensure!(
            !octets.is_empty(),
            InvalidOctetLengthSnafu {
                algorithm: "boolean",
                length: 0usize,
            }
        );
        let pad = octets[0] >> 4;
        ensure!(pad <= 7, InvalidPadCountSnafu { count: pad });
        let total_bits = octets.len() * 8 - 4;
        ensure!(
            usize::from(pad) <= total_bits,
            InvalidPadCountSnafu { count: pad }
        );
        let count = total_bits - usize::from(pad);
        for i in 0..count {
            let position = 4 + i;
            let bit = (octets[position / 8] >> (7 - position % 8)) & 1;
            push_separated(out, i == 0, if bit == 1 { "true" } else { "false" });
        }
        Ok(())
    }
}

/// 16-octet UUID values, rendered in the hyphenated hexadecimal form.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct UuidAlgorithm;

impl EncodingAlgorithm for UuidAlgorithm {
    fn octets_from_string(&self, text: &str) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for token in text.split_whitespace() {
            let digits: Vec<char> = token.chars().filter(|c| *c != '-').collect();
            ensure!(
                digits.len() == 32,
                InvalidHexSnafu {
                    message: format!("UUID {:?} does not hold 32 digits", token),
                }
            );
            for pair in digits.chunks_exact(2) {
                out.push(hex_value(pair[0])? << 4 | hex_value(pair[1])?);
            }
        }
        Ok(out)
    }

    fn string_from_octets(&self, octets: &[u8], out: &mut String) -> Result<()> {
        ensure!(
            octets.len() % 16 == 0,
            InvalidOctetLengthSnafu {
                algorithm: "uuid",
                length: octets.len(),
            }
        );
        for (i, uuid) in octets.chunks_exact(16).enumerate() {
            if i > 0 {
                out.push(' ');
            }
            for (position, &octet) in uuid.iter().enumerate() {
                if matches!(position, 4 | 6 | 8 | 10) {
                    out.push('-');
                }
                out.push(char::from(b"0123456789abcdef"[usize::from(octet >> 4)]));
                out.push(char::from(b"0123456789abcdef"[usize::from(octet & 0x0F)]));
            }
        }
        Ok(())
    }
}

/// Verbatim UTF-8 octets, reported as a CDATA section.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CdataAlgorithm;

impl EncodingAlgorithm for CdataAlgorithm {
    fn octets_from_string(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }

    fn string_from_octets(&self, octets: &[u8], out: &mut String) -> Result<()> {
        out.push_str(std::str::from_utf8(octets).context(DecodeUtf8Snafu)?);
        Ok(())
    }
}

/// Serialize 16-bit values into the wire form of the `short` algorithm.
pub fn octets_from_shorts(values: &[i16]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * 2);
    let mut writer = ByteOrdered::be(&mut out);
    for &value in values {
        writer.write_i16(value).context(WriteValueSnafu)?;
    }
    Ok(out)
}

/// Serialize 32-bit values into the wire form of the `int` algorithm.
pub fn octets_from_ints(values: &[i32]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * 4);
    let mut writer = ByteOrdered::be(&mut out);
    for &value in values {
        writer.write_i32(value).context(WriteValueSnafu)?;
    }
    Ok(out)
}

/// Serialize 64-bit values into the wire form of the `long` algorithm.
pub fn octets_from_longs(values: &[i64]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * 8);
    let mut writer = ByteOrdered::be(&mut out);
    for &value in values {
        writer.write_i64(value).context(WriteValueSnafu)?;
    }
    Ok(out)
}

/// Serialize 32-bit floating point values into the `float` wire form.
pub fn octets_from_floats(values: &[f32]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * 4);
    let mut writer = ByteOrdered::be(&mut out);
    for &value in values {
        writer.write_f32(value).context(WriteValueSnafu)?;
    }
    Ok(out)
}

/// Serialize 64-bit floating point values into the `double` wire form.
pub fn octets_from_doubles(values: &[f64]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(values.len() * 8);
    let mut writer = ByteOrdered::be(&mut out);
    for &value in values {
        writer.write_f64(value).context(WriteValueSnafu)?;
    }
    Ok(out)
}

/// Serialize booleans into the packed wire form of the `boolean` algorithm.
pub fn octets_from_booleans(values: &[bool]) -> Result<Vec<u8>> {
    let mut text = String::new();
    for (i, &value) in values.iter().enumerate() {
        push_separated(&mut text, i == 0, if value { "true" } else { "false" });
    }
    BooleanAlgorithm.octets_from_string(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Error;

    #[test]
    fn int_values_round_trip_through_the_wire_form() {
        let octets = octets_from_ints(&[1, -1]).unwrap();
        assert_eq!(octets, vec![0x00, 0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF]);

        let mut text = String::new();
        IntAlgorithm.string_from_octets(&octets, &mut text).unwrap();
        assert_eq!(text, "1 -1");

        assert_eq!(IntAlgorithm.octets_from_string("1 -1").unwrap(), octets);
    }

    #[test]
    fn short_and_long_are_sized_correctly() {
        assert_eq!(octets_from_shorts(&[258]).unwrap(), vec![0x01, 0x02]);
        assert_eq!(
            octets_from_longs(&[-2]).unwrap(),
            vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]
        );
        let mut text = String::new();
        ShortAlgorithm
            .string_from_octets(&[0x01, 0x02, 0xFF, 0xFE], &mut text)
            .unwrap();
        assert_eq!(text, "258 -2");
    }

    #[test]
    fn misaligned_integer_data_is_rejected() {
        let mut text = String::new();
        assert!(matches!(
            IntAlgorithm.string_from_octets(&[0, 0, 0], &mut text),
            Err(Error::InvalidOctetLength { .. })
        ));
    }

    #[test]
    fn hex_renders_uppercase_and_parses_both_cases() {
        let mut text = String::new();
        HexAlgorithm
            .string_from_octets(&[0xDE, 0xAD, 0x01], &mut text)
            .unwrap();
        assert_eq!(text, "DEAD01");
        assert_eq!(
            HexAlgorithm.octets_from_string("dead01").unwrap(),
            vec![0xDE, 0xAD, 0x01]
        );
        assert!(HexAlgorithm.octets_from_string("abc").is_err());
    }

    #[test]
    fn base64_round_trips() {
        let mut text = String::new();
        Base64Algorithm
            .string_from_octets(b"any carnal pleasure", &mut text)
            .unwrap();
        assert_eq!(text, "YW55IGNhcm5hbCBwbGVhc3VyZQ==");
        assert_eq!(
            Base64Algorithm.octets_from_string(&text).unwrap(),
            b"any carnal pleasure".to_vec()
        );
    }

    #[test]
    fn booleans_pack_with_a_leading_pad_count() {
        // 4 count bits + 3 values + 1 pad bit
        let octets = octets_from_booleans(&[true, false, true]).unwrap();
        assert_eq!(octets, vec![0b0001_1010]);

        let mut text = String::new();
        BooleanAlgorithm
            .string_from_octets(&octets, &mut text)
            .unwrap();
        assert_eq!(text, "true false true");
    }

    #[test]
    fn booleans_crossing_an_octet_boundary() {
        let values = [true, true, false, false, true, false];
        let octets = octets_from_booleans(&values).unwrap();
        // 4 + 6 bits = 10, padded to 16 with 6 bits
        assert_eq!(octets.len(), 2);
        assert_eq!(octets[0] >> 4, 6);

        let mut text = String::new();
        BooleanAlgorithm
            .string_from_octets(&octets, &mut text)
            .unwrap();
        assert_eq!(text, "true true false false true false");
    }

    #[test]
    fn floats_render_in_plain_decimal() {
        let octets = octets_from_floats(&[1.5, -2.0]).unwrap();
        assert_eq!(octets.len(), 8);
        let mut text = String::new();
        FloatAlgorithm.string_from_octets(&octets, &mut text).unwrap();
        assert_eq!(text, "1.5 -2");
        assert_eq!(FloatAlgorithm.octets_from_string("1.5 -2").unwrap(), octets);
    }

    #[test]
    fn uuids_render_hyphenated() {
        let octets: Vec<u8> = (0..16).collect();
        let mut text = String::new();
        UuidAlgorithm.string_from_octets(&octets, &mut text).unwrap();
        assert_eq!(text, "00010203-0405-0607-0809-0a0b0c0d0e0f");
        assert_eq!(UuidAlgorithm.octets_from_string(&text).unwrap(), octets);
    }

    #[test]
    fn cdata_is_verbatim_utf8() {
        let mut text = String::new();
        CdataAlgorithm
            .string_from_octets("héllo".as_bytes(), &mut text)
            .unwrap();
        assert_eq!(text, "héllo");
        assert!(CdataAlgorithm
            .string_from_octets(&[0xFF, 0xFE], &mut text)
            .is_err());
    }
}
