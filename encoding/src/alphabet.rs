//! Restricted alphabets: small ordered character sets enabling bit-packed
//! string encoding.
//!
//! An alphabet of `N` characters packs each character into
//! `ceil(log2(N + 1))` bits; the all-ones pattern of that width is reserved
//! as the terminator which pads the final octet. The two built-in alphabets
//! of X.891 (numeric and date-time) occupy table indices 1 and 2; alphabets
//! supplied through an initial vocabulary or registered by the application
//! start at index 16.

use lazy_static::lazy_static;
use snafu::{Backtrace, OptionExt, Snafu};
use std::collections::HashMap;
use std::sync::Arc;

/// The characters of the built-in *numeric* alphabet (table index 1).
pub const NUMERIC_CHARACTERS: &str = "0123456789-+.e ";

/// The characters of the built-in *date and time* alphabet (table index 2).
pub const DATE_TIME_CHARACTERS: &str = "0123456789-:TZ ";

/// Table index of the built-in numeric alphabet.
pub const NUMERIC_ALPHABET: u32 = 1;

/// Table index of the built-in date-time alphabet.
pub const DATE_TIME_ALPHABET: u32 = 2;

/// First table index available to application-defined alphabets.
pub const EXTENDED_ALPHABET_START: u32 = 16;

/// Last valid alphabet table index; the wire form is `index - 1` in 8 bits.
pub const MAX_ALPHABET_INDEX: u32 = 256;

/// Module-level error type:
/// for alphabet construction and packing failures.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Character {:?} is not in the restricted alphabet", character))]
    CharacterNotInAlphabet {
        character: char,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid restricted alphabet: {}", message))]
    InvalidRestrictedAlphabet {
        message: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Restricted alphabet data contains invalid index {}", index))]
    InvalidCharacterIndex { index: u32, backtrace: Backtrace },

    #[snafu(display("No restricted alphabet at table index {}", index))]
    UnknownRestrictedAlphabet { index: u32, backtrace: Backtrace },

    #[snafu(display("No table index left for another restricted alphabet"))]
    AlphabetTableFull { backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An ordered, distinct sequence of characters with a bit-packed encoding.
#[derive(Debug, Clone)]
pub struct RestrictedAlphabet {
    characters: Vec<char>,
    index_of: HashMap<char, u32>,
    bits: u32,
}

impl RestrictedAlphabet {
    /// Create an alphabet from its ordered character sequence.
    ///
    /// The sequence must hold at least 2 distinct characters and no more
    /// than 255, so that every character index and the terminator fit the
    /// supported packing widths of up to 8 bits.
    pub fn new(characters: &str) -> Result<Self> {
        let characters: Vec<char> = characters.chars().collect();
        snafu::ensure!(
            characters.len() >= 2,
            InvalidRestrictedAlphabetSnafu {
                message: format!("{} characters, need at least 2", characters.len()),
            }
        );
        snafu::ensure!(
            characters.len() <= 255,
            InvalidRestrictedAlphabetSnafu {
                message: format!("{} characters exceed the 8-bit packing limit", characters.len()),
            }
        );
        let mut index_of = HashMap::with_capacity(characters.len());
        for (i, c) in characters.iter().enumerate() {
            snafu::ensure!(
                index_of.insert(*c, i as u32).is_none(),
                InvalidRestrictedAlphabetSnafu {
                    message: format!("duplicate character {:?}", c),
                }
            );
        }
        let bits = 32 - (characters.len() as u32).leading_zeros();
        Ok(RestrictedAlphabet {
            characters,
            index_of,
            bits,
        })
    }

    /// The built-in numeric alphabet.
    pub fn numeric() -> Self {
        RestrictedAlphabet::new(NUMERIC_CHARACTERS).unwrap()
    }

    /// The built-in date-time alphabet.
    pub fn date_time() -> Self {
        RestrictedAlphabet::new(DATE_TIME_CHARACTERS).unwrap()
    }

    /// The ordered characters of the alphabet.
    pub fn characters(&self) -> impl Iterator<Item = char> + '_ {
        self.characters.iter().copied()
    }

    /// The per-character bit width, `ceil(log2(N + 1))`.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    fn terminator(&self) -> u32 {
        (1 << self.bits) - 1
    }

    /// Pack a character string into octets.
    pub fn encode(&self, text: &str, out: &mut Vec<u8>) -> Result<()> {
        match self.bits {
            8 => {
                for c in text.chars() {
                    out.push(self.index_for(c)? as u8);
                }
            }
            4 => {
                let mut chars = text.chars();
                while let Some(high) = chars.next() {
                    let high = self.index_for(high)? as u8;
                    match chars.next() {
                        Some(low) => out.push(high << 4 | self.index_for(low)? as u8),
                        // lone final character: terminator nibble below
                        None => out.push(high << 4 | 0x0F),
                    }
                }
            }
            _ => {
                let mut accumulator = 0u32;
                let mut pending = 0u32;
                for c in text.chars() {
                    accumulator = (accumulator << self.bits) | self.index_for(c)?;
                    pending += self.bits;
                    while pending >= 8 {
                        pending -= 8;
                        out.push((accumulator >> pending) as u8);
                    }
                }
                if pending > 0 {
                    // the terminator is all ones, so padding is too
                    let padding = 8 - pending;
                    out.push(((accumulator << padding) as u8) | ((1u32 << padding) - 1) as u8);
                }
            }
        }
        Ok(())
    }

    /// Unpack octets back into characters, stopping at the terminator.
    pub fn decode(&self, data: &[u8], out: &mut String) -> Result<()> {
        match self.bits {
            8 => {
                for &octet in data {
                    out.push(self.character_at(u32::from(octet))?);
                }
            }
            4 => {
                for &octet in data {
                    let high = u32::from(octet >> 4);
                    if high == 0x0F {
                        break;
                    }
                    out.push(self.character_at(high)?);
                    let low = u32::from(octet & 0x0F);
                    if low == 0x0F {
                        break;
                    }
                    out.push(self.character_at(low)?);
                }
            }
            _ => {
                let mut accumulator = 0u32;
                let mut pending = 0u32;
                'unpack: for &octet in data {
                    accumulator = (accumulator << 8) | u32::from(octet);
                    pending += 8;
                    while pending >= self.bits {
                        pending -= self.bits;
                        let value = (accumulator >> pending) & self.terminator();
                        if value == self.terminator() {
                            break 'unpack;
                        }
                        out.push(self.character_at(value)?);
                    }
                }
            }
        }
        Ok(())
    }

    fn index_for(&self, c: char) -> Result<u32> {
        self.index_of
            .get(&c)
            .copied()
            .context(CharacterNotInAlphabetSnafu { character: c })
    }

    fn character_at(&self, index: u32) -> Result<char> {
        self.characters
            .get(index as usize)
            .copied()
            .context(InvalidCharacterIndexSnafu { index })
    }
}

/// A read-only mapping of alphabet table indices to alphabets.
///
/// Registration happens before any codec is constructed; during coding the
/// registry is shared behind an [`Arc`] and never mutated.
#[derive(Debug, Clone)]
pub struct AlphabetRegistry {
    entries: HashMap<u32, RestrictedAlphabet>,
    next_extended: u32,
}

impl AlphabetRegistry {
    /// Create a registry holding the two built-in alphabets.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(NUMERIC_ALPHABET, RestrictedAlphabet::numeric());
        entries.insert(DATE_TIME_ALPHABET, RestrictedAlphabet::date_time());
        AlphabetRegistry {
            entries,
            next_extended: EXTENDED_ALPHABET_START,
        }
    }

    /// Look up an alphabet by its 1-based table index.
    pub fn get(&self, index: u32) -> Result<&RestrictedAlphabet> {
        self.entries
            .get(&index)
            .context(UnknownRestrictedAlphabetSnafu { index })
    }

    /// Register an application alphabet at the next extended table index.
    pub fn register(&mut self, alphabet: RestrictedAlphabet) -> Result<u32> {
        snafu::ensure!(
            self.next_extended <= MAX_ALPHABET_INDEX,
            AlphabetTableFullSnafu
        );
        let index = self.next_extended;
        self.entries.insert(index, alphabet);
        self.next_extended += 1;
        Ok(index)
    }
}

impl Default for AlphabetRegistry {
    fn default() -> Self {
        AlphabetRegistry::new()
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: Arc<AlphabetRegistry> = Arc::new(AlphabetRegistry::new());
}

/// Retrieve the shared registry holding only the built-in alphabets.
pub fn default_registry() -> Arc<AlphabetRegistry> {
    DEFAULT_REGISTRY.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_alphabet_packs_two_characters_per_octet() {
        let alphabet = RestrictedAlphabet::numeric();
        assert_eq!(alphabet.bits(), 4);
        let mut out = Vec::new();
        alphabet.encode("3.14e0", &mut out).unwrap();
        assert_eq!(out, vec![0x3C, 0x14, 0xD0]);

        let mut text = String::new();
        alphabet.decode(&out, &mut text).unwrap();
        assert_eq!(text, "3.14e0");
    }

    #[test]
    fn odd_length_ends_with_the_terminator_nibble() {
        let alphabet = RestrictedAlphabet::numeric();
        let mut out = Vec::new();
        alphabet.encode("123", &mut out).unwrap();
        assert_eq!(out, vec![0x12, 0x3F]);

        let mut text = String::new();
        alphabet.decode(&out, &mut text).unwrap();
        assert_eq!(text, "123");
    }

    #[test]
    fn foreign_characters_are_rejected() {
        let alphabet = RestrictedAlphabet::numeric();
        let mut out = Vec::new();
        assert!(matches!(
            alphabet.encode("12a", &mut out),
            Err(Error::CharacterNotInAlphabet { character: 'a', .. })
        ));
    }

    #[test]
    fn general_width_round_trips_unaligned_lengths() {
        // 5 characters need 3 bits each
        let alphabet = RestrictedAlphabet::new("abcde").unwrap();
        assert_eq!(alphabet.bits(), 3);
        for text in ["a", "ab", "abc", "abcd", "abcde", "edcba", "aaaaaaa"] {
            let mut packed = Vec::new();
            alphabet.encode(text, &mut packed).unwrap();
            assert!(packed.len() * 8 >= text.len() * 3);
            let mut unpacked = String::new();
            alphabet.decode(&packed, &mut unpacked).unwrap();
            assert_eq!(unpacked, text, "text {:?}", text);
        }
    }

    #[test]
    fn identity_width_uses_one_octet_per_character() {
        let characters: String = (0..200u32)
            .map(|i| char::from_u32(0x30 + i).unwrap())
            .collect();
        let alphabet = RestrictedAlphabet::new(&characters).unwrap();
        assert_eq!(alphabet.bits(), 8);

        let mut packed = Vec::new();
        alphabet.encode("0123", &mut packed).unwrap();
        assert_eq!(packed, vec![0, 1, 2, 3]);
        let mut text = String::new();
        alphabet.decode(&packed, &mut text).unwrap();
        assert_eq!(text, "0123");
    }

    #[test]
    fn registry_assigns_extended_indices_from_sixteen() {
        let mut registry = AlphabetRegistry::new();
        assert!(registry.get(NUMERIC_ALPHABET).is_ok());
        assert!(registry.get(DATE_TIME_ALPHABET).is_ok());
        assert!(matches!(
            registry.get(3),
            Err(Error::UnknownRestrictedAlphabet { index: 3, .. })
        ));
        let index = registry
            .register(RestrictedAlphabet::new("abc").unwrap())
            .unwrap();
        assert_eq!(index, EXTENDED_ALPHABET_START);
        assert!(registry.get(index).is_ok());
    }

    #[test]
    fn alphabets_must_be_distinct_and_small() {
        assert!(RestrictedAlphabet::new("a").is_err());
        assert!(RestrictedAlphabet::new("aa").is_err());
        let too_big: String = (0..256u32)
            .map(|i| char::from_u32(0x100 + i).unwrap())
            .collect();
        assert!(RestrictedAlphabet::new(&too_big).is_err());
    }
}
