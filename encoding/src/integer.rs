//! Variable-width integer and octet-string length codecs.
//!
//! X.891 encodes small integers and lengths with byte widths chosen by
//! discriminator bits, and the discriminator layout depends on the bit
//! position at which the field starts within its enclosing octet. Each
//! codec here is named by that starting position (1-indexed from the most
//! significant bit).
//!
//! Reading functions take the already-consumed first octet of the field,
//! since the caller needed it to dispatch on the item identifier; writing
//! functions take the identifier bits to place above the field in the
//! first octet.

use crate::buffer::{BlockReader, BlockWriter};
use snafu::{Backtrace, Snafu};
use std::io::{Read, Write};

/// The highest value any vocabulary table index may take.
pub const MAX_INDEX: u32 = 1 << 20;

/// Module-level error type:
/// for malformed variable-width integer and length fields.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Invalid integer discriminator in octet {:#04x}", octet))]
    InvalidIntegerEncoding { octet: u8, backtrace: Backtrace },

    #[snafu(display("Integer value {} is out of range", value))]
    IntegerOutOfRange { value: u32, backtrace: Backtrace },

    #[snafu(display("Invalid length discriminator in octet {:#04x}", octet))]
    InvalidLengthEncoding { octet: u8, backtrace: Backtrace },

    #[snafu(display("Length value {} is out of range", value))]
    LengthOutOfRange { value: u64, backtrace: Backtrace },

    #[snafu(transparent)]
    ReadBytes { source: crate::buffer::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn read_u8<R: Read>(reader: &mut BlockReader<R>) -> Result<u32> {
    Ok(u32::from(reader.read_byte()?))
}

fn read_be<R: Read>(reader: &mut BlockReader<R>, octets: u32) -> Result<u32> {
    let mut value = 0u32;
    for _ in 0..octets {
        value = (value << 8) | read_u8(reader)?;
    }
    Ok(value)
}

fn write_be<W: Write>(writer: &mut BlockWriter<W>, value: u32, octets: u32) -> Result<()> {
    for shift in (0..octets).rev() {
        writer.write_byte((value >> (shift * 8)) as u8)?;
    }
    Ok(())
}

/// Decode an integer in 1..2^20 whose field starts on the second bit,
/// given the first octet of the field.
pub fn read_nonzero_bit2<R: Read>(reader: &mut BlockReader<R>, octet: u8) -> Result<u32> {
    let field = u32::from(octet & 0x7F);
    let value = if field & 0x40 == 0 {
        field + 1
    } else if field & 0x60 == 0x40 {
        (((field & 0x1F) << 8) | read_u8(reader)?) + 65
    } else if field & 0x70 == 0x60 {
        ((field & 0x0F) << 16 | read_be(reader, 2)?) + 8257
    } else {
        return InvalidIntegerEncodingSnafu { octet }.fail();
    };
    snafu::ensure!(value <= MAX_INDEX, IntegerOutOfRangeSnafu { value });
    Ok(value)
}

/// Encode an integer in 1..2^20 starting on the second bit. `identifier`
/// holds the caller's bit 1.
pub fn write_nonzero_bit2<W: Write>(
    writer: &mut BlockWriter<W>,
    identifier: u8,
    value: u32,
) -> Result<()> {
    debug_assert!(value >= 1 && value <= MAX_INDEX);
    match value {
        1..=64 => writer.write_byte(identifier | (value - 1) as u8)?,
        65..=8256 => {
            let field = value - 65;
            writer.write_byte(identifier | 0x40 | (field >> 8) as u8)?;
            writer.write_byte(field as u8)?;
        }
        _ => {
            let field = value - 8257;
            writer.write_byte(identifier | 0x60 | (field >> 16) as u8)?;
            write_be(writer, field & 0xFFFF, 2)?;
        }
    }
    Ok(())
}

/// Decode an integer in 0..2^20 whose field starts on the second bit.
/// Zero is spelled as the all-ones 7-bit field.
pub fn read_zero_bit2<R: Read>(reader: &mut BlockReader<R>, octet: u8) -> Result<u32> {
    if octet & 0x7F == 0x7F {
        Ok(0)
    } else {
        read_nonzero_bit2(reader, octet)
    }
}

/// Encode an integer in 0..2^20 starting on the second bit.
pub fn write_zero_bit2<W: Write>(
    writer: &mut BlockWriter<W>,
    identifier: u8,
    value: u32,
) -> Result<()> {
    if value == 0 {
        writer.write_byte(identifier | 0x7F)?;
        Ok(())
    } else {
        write_nonzero_bit2(writer, identifier, value)
    }
}

/// Decode an integer in 1..2^20 whose field starts on the third bit,
/// given the first octet of the field.
pub fn read_nonzero_bit3<R: Read>(reader: &mut BlockReader<R>, octet: u8) -> Result<u32> {
    let field = u32::from(octet & 0x3F);
    let value = if field & 0x20 == 0 {
        field + 1
    } else if field & 0x38 == 0x20 {
        (((field & 0x07) << 8) | read_u8(reader)?) + 33
    } else if field & 0x38 == 0x28 {
        (((field & 0x07) << 16) | read_be(reader, 2)?) + 2081
    } else if field == 0x30 {
        read_be(reader, 3)? + 526_369
    } else {
        return InvalidIntegerEncodingSnafu { octet }.fail();
    };
    snafu::ensure!(value <= MAX_INDEX, IntegerOutOfRangeSnafu { value });
    Ok(value)
}

/// Encode an integer in 1..2^20 starting on the third bit. `identifier`
/// holds the caller's bits 1-2.
pub fn write_nonzero_bit3<W: Write>(
    writer: &mut BlockWriter<W>,
    identifier: u8,
    value: u32,
) -> Result<()> {
    debug_assert!(value >= 1 && value <= MAX_INDEX);
    match value {
        1..=32 => writer.write_byte(identifier | (value - 1) as u8)?,
        33..=2080 => {
            let field = value - 33;
            writer.write_byte(identifier | 0x20 | (field >> 8) as u8)?;
            writer.write_byte(field as u8)?;
        }
        2081..=526_368 => {
            let field = value - 2081;
            writer.write_byte(identifier | 0x28 | (field >> 16) as u8)?;
            write_be(writer, field & 0xFFFF, 2)?;
        }
        _ => {
            writer.write_byte(identifier | 0x30)?;
            write_be(writer, value - 526_369, 3)?;
        }
    }
    Ok(())
}

/// Decode an integer in 1..2^20 whose field starts on the fourth bit,
/// given the first octet of the field.
pub fn read_nonzero_bit4<R: Read>(reader: &mut BlockReader<R>, octet: u8) -> Result<u32> {
    let field = u32::from(octet & 0x1F);
    let value = if field & 0x10 == 0 {
        field + 1
    } else if field & 0x1C == 0x10 {
        (((field & 0x03) << 8) | read_u8(reader)?) + 17
    } else if field & 0x1C == 0x14 {
        (((field & 0x03) << 16) | read_be(reader, 2)?) + 1041
    } else if field == 0x18 {
        read_be(reader, 3)? + 263_185
    } else {
        return InvalidIntegerEncodingSnafu { octet }.fail();
    };
    snafu::ensure!(value <= MAX_INDEX, IntegerOutOfRangeSnafu { value });
    Ok(value)
}

/// Encode an integer in 1..2^20 starting on the fourth bit. `identifier`
/// holds the caller's bits 1-3.
pub fn write_nonzero_bit4<W: Write>(
    writer: &mut BlockWriter<W>,
    identifier: u8,
    value: u32,
) -> Result<()> {
    debug_assert!(value >= 1 && value <= MAX_INDEX);
    match value {
        1..=16 => writer.write_byte(identifier | (value - 1) as u8)?,
        17..=1040 => {
            let field = value - 17;
            writer.write_byte(identifier | 0x10 | (field >> 8) as u8)?;
            writer.write_byte(field as u8)?;
        }
        1041..=263_184 => {
            let field = value - 1041;
            writer.write_byte(identifier | 0x14 | (field >> 16) as u8)?;
            write_be(writer, field & 0xFFFF, 2)?;
        }
        _ => {
            writer.write_byte(identifier | 0x18)?;
            write_be(writer, value - 263_185, 3)?;
        }
    }
    Ok(())
}

/// Decode an octet-string length whose field starts on the second bit,
/// given the first octet of the field.
pub fn read_len_bit2<R: Read>(reader: &mut BlockReader<R>, octet: u8) -> Result<u64> {
    let field = octet & 0x7F;
    if field & 0x40 == 0 {
        Ok(u64::from(field) + 1)
    } else if field == 0x40 {
        Ok(u64::from(reader.read_byte()?) + 65)
    } else if field == 0x60 {
        Ok(u64::from(read_be(reader, 4)?) + 321)
    } else {
        InvalidLengthEncodingSnafu { octet }.fail()
    }
}

/// Encode an octet-string length starting on the second bit.
pub fn write_len_bit2<W: Write>(
    writer: &mut BlockWriter<W>,
    identifier: u8,
    length: u64,
) -> Result<()> {
    match length {
        1..=64 => writer.write_byte(identifier | (length - 1) as u8)?,
        65..=320 => {
            writer.write_byte(identifier | 0x40)?;
            writer.write_byte((length - 65) as u8)?;
        }
        321..=0x1_0000_0140 => {
            writer.write_byte(identifier | 0x60)?;
            write_be(writer, (length - 321) as u32, 4)?;
        }
        _ => return LengthOutOfRangeSnafu { value: length }.fail(),
    }
    Ok(())
}

/// Decode an octet-string length whose field starts on the fifth bit,
/// given the first octet of the field.
pub fn read_len_bit5<R: Read>(reader: &mut BlockReader<R>, octet: u8) -> Result<u64> {
    let field = octet & 0x0F;
    if field & 0x08 == 0 {
        Ok(u64::from(field) + 1)
    } else if field == 0x08 {
        Ok(u64::from(reader.read_byte()?) + 9)
    } else if field == 0x0C {
        Ok(u64::from(read_be(reader, 4)?) + 265)
    } else {
        InvalidLengthEncodingSnafu { octet }.fail()
    }
}

/// Encode an octet-string length starting on the fifth bit.
pub fn write_len_bit5<W: Write>(
    writer: &mut BlockWriter<W>,
    identifier: u8,
    length: u64,
) -> Result<()> {
    match length {
        1..=8 => writer.write_byte(identifier | (length - 1) as u8)?,
        9..=264 => {
            writer.write_byte(identifier | 0x08)?;
            writer.write_byte((length - 9) as u8)?;
        }
        265..=0x1_0000_0108 => {
            writer.write_byte(identifier | 0x0C)?;
            write_be(writer, (length - 265) as u32, 4)?;
        }
        _ => return LengthOutOfRangeSnafu { value: length }.fail(),
    }
    Ok(())
}

/// Decode an octet-string length whose field starts on the seventh bit,
/// given the first octet of the field.
pub fn read_len_bit7<R: Read>(reader: &mut BlockReader<R>, octet: u8) -> Result<u64> {
    let field = octet & 0x03;
    if field & 0x02 == 0 {
        Ok(u64::from(field) + 1)
    } else if field == 0x02 {
        Ok(u64::from(reader.read_byte()?) + 3)
    } else {
        Ok(u64::from(read_be(reader, 4)?) + 259)
    }
}

/// Encode an octet-string length starting on the seventh bit.
pub fn write_len_bit7<W: Write>(
    writer: &mut BlockWriter<W>,
    identifier: u8,
    length: u64,
) -> Result<()> {
    match length {
        1..=2 => writer.write_byte(identifier | (length - 1) as u8)?,
        3..=258 => {
            writer.write_byte(identifier | 0x02)?;
            writer.write_byte((length - 3) as u8)?;
        }
        259..=0x1_0000_0102 => {
            writer.write_byte(identifier | 0x03)?;
            write_be(writer, (length - 259) as u32, 4)?;
        }
        _ => return LengthOutOfRangeSnafu { value: length }.fail(),
    }
    Ok(())
}

/// Decode an item count of an optional document component (X.891 C.21).
pub fn read_sequence_len<R: Read>(reader: &mut BlockReader<R>) -> Result<u32> {
    let octet = reader.read_byte()?;
    if octet & 0x80 == 0 {
        Ok(u32::from(octet) + 1)
    } else if octet & 0xF0 == 0x80 {
        let value = (u32::from(octet & 0x0F) << 16 | read_be(reader, 2)?) + 129;
        snafu::ensure!(value <= MAX_INDEX, IntegerOutOfRangeSnafu { value });
        Ok(value)
    } else {
        InvalidIntegerEncodingSnafu { octet }.fail()
    }
}

/// Encode an item count of an optional document component (X.891 C.21).
pub fn write_sequence_len<W: Write>(writer: &mut BlockWriter<W>, count: u32) -> Result<()> {
    debug_assert!(count >= 1 && count <= MAX_INDEX);
    if count <= 128 {
        writer.write_byte((count - 1) as u8)?;
    } else {
        let field = count - 129;
        writer.write_byte(0x80 | (field >> 16) as u8)?;
        write_be(writer, field & 0xFFFF, 2)?;
    }
    Ok(())
}
