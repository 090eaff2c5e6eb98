//! Encoding algorithms: typed binary encodings for element content.
//!
//! An algorithm converts between the octets carried on the wire and the
//! character string which the infoset reports for the content. The ten
//! built-in algorithms of X.891 occupy table indices 1..10; applications
//! may register further algorithms by URI, which occupy indices 32..255 in
//! insertion order. The wire form of the table index is `index - 1` in
//! 8 bits.
//!
//! Registration happens before a codec is constructed; during coding the
//! registry is shared behind an [`Arc`] and never mutated.

use lazy_static::lazy_static;
use snafu::{Backtrace, OptionExt, Snafu};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

pub mod builtin;

pub use builtin::{
    Base64Algorithm, BooleanAlgorithm, CdataAlgorithm, DoubleAlgorithm, FloatAlgorithm,
    HexAlgorithm, IntAlgorithm, LongAlgorithm, ShortAlgorithm, UuidAlgorithm,
};

/// The table indices of the built-in encoding algorithms.
pub mod indices {
    /// Hexadecimal octet dump.
    pub const HEX: u32 = 1;
    /// Standard base64.
    pub const BASE64: u32 = 2;
    /// 16-bit big-endian signed integers.
    pub const SHORT: u32 = 3;
    /// 32-bit big-endian signed integers.
    pub const INT: u32 = 4;
    /// 64-bit big-endian signed integers.
    pub const LONG: u32 = 5;
    /// Bit-packed booleans with a leading pad count.
    pub const BOOLEAN: u32 = 6;
    /// 32-bit IEEE 754 big-endian floating point.
    pub const FLOAT: u32 = 7;
    /// 64-bit IEEE 754 big-endian floating point.
    pub const DOUBLE: u32 = 8;
    /// 16-octet UUID values.
    pub const UUID: u32 = 9;
    /// Verbatim UTF-8, reported as a CDATA section.
    pub const CDATA: u32 = 10;
}

/// First table index available to URI-registered algorithms.
pub const EXTENDED_ALGORITHM_START: u32 = 32;

/// Last valid algorithm table index.
pub const MAX_ALGORITHM_INDEX: u32 = 255;

/// Module-level error type:
/// for algorithm lookup and data conversion failures.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("No encoding algorithm at table index {}", index))]
    UnknownEncodingAlgorithm { index: u32, backtrace: Backtrace },

    #[snafu(display("No encoding algorithm registered for URI {}", uri))]
    UnknownAlgorithmUri { uri: String, backtrace: Backtrace },

    #[snafu(display("An extended encoding algorithm requires a URI"))]
    MissingAlgorithmUri { backtrace: Backtrace },

    #[snafu(display("No table index left for another encoding algorithm"))]
    AlgorithmTableFull { backtrace: Backtrace },

    #[snafu(display("{} data length {} is not a whole number of values", algorithm, length))]
    InvalidOctetLength {
        algorithm: &'static str,
        length: usize,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not parse {:?} as an integer", token))]
    ParseInteger {
        token: String,
        source: std::num::ParseIntError,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not parse {:?} as a floating point number", token))]
    ParseFloat {
        token: String,
        source: std::num::ParseFloatError,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not parse {:?} as a boolean", token))]
    ParseBoolean { token: String, backtrace: Backtrace },

    #[snafu(display("Invalid base64 payload"))]
    InvalidBase64 {
        source: base64::DecodeError,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid hexadecimal payload: {}", message))]
    InvalidHex {
        message: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid boolean pad count {}", count))]
    InvalidPadCount { count: u8, backtrace: Backtrace },

    #[snafu(display("Algorithm payload is not valid UTF-8"))]
    DecodeUtf8 {
        source: std::str::Utf8Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not serialize a typed value"))]
    WriteValue {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not deserialize a typed value"))]
    ReadValue {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Trait for converting between the wire octets of an encoded content
/// chunk and its character string form.
///
/// Implementations must be pure functions of their input: the registry
/// holding them is shared and read-only during coding.
pub trait EncodingAlgorithm: Debug + Send + Sync {
    /// The URI identifying an extended algorithm,
    /// or `None` for the built-in algorithms.
    fn uri(&self) -> Option<&str> {
        None
    }

    /// Convert the string form into wire octets.
    fn octets_from_string(&self, text: &str) -> Result<Vec<u8>>;

    /// Convert wire octets into the string form, appending to `out`.
    fn string_from_octets(&self, octets: &[u8], out: &mut String) -> Result<()>;
}

static BUILTIN: [&dyn EncodingAlgorithm; 10] = [
    &HexAlgorithm,
    &Base64Algorithm,
    &ShortAlgorithm,
    &IntAlgorithm,
    &LongAlgorithm,
    &BooleanAlgorithm,
    &FloatAlgorithm,
    &DoubleAlgorithm,
    &UuidAlgorithm,
    &CdataAlgorithm,
];

/// A read-only mapping of algorithm table indices to implementations.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmRegistry {
    extended: Vec<Arc<dyn EncodingAlgorithm>>,
    by_uri: HashMap<String, u32>,
}

impl AlgorithmRegistry {
    /// Create a registry holding only the built-in algorithms.
    pub fn new() -> Self {
        AlgorithmRegistry::default()
    }

    /// Look up an algorithm by its 1-based table index.
    pub fn get(&self, index: u32) -> Result<&dyn EncodingAlgorithm> {
        if (1..=10).contains(&index) {
            return Ok(BUILTIN[index as usize - 1]);
        }
        if index >= EXTENDED_ALGORITHM_START && index <= MAX_ALGORITHM_INDEX {
            if let Some(algorithm) = self.extended.get((index - EXTENDED_ALGORITHM_START) as usize)
            {
                return Ok(&**algorithm);
            }
        }
        UnknownEncodingAlgorithmSnafu { index }.fail()
    }

    /// Look up an extended algorithm's table index by URI.
    pub fn index_of_uri(&self, uri: &str) -> Result<u32> {
        self.by_uri
            .get(uri)
            .copied()
            .context(UnknownAlgorithmUriSnafu { uri })
    }

    /// Register an extended algorithm at the next table index from 32.
    pub fn register(&mut self, algorithm: Arc<dyn EncodingAlgorithm>) -> Result<u32> {
        let uri = algorithm.uri().context(MissingAlgorithmUriSnafu)?.to_owned();
        let index = EXTENDED_ALGORITHM_START + self.extended.len() as u32;
        snafu::ensure!(index <= MAX_ALGORITHM_INDEX, AlgorithmTableFullSnafu);
        self.extended.push(algorithm);
        self.by_uri.insert(uri, index);
        Ok(index)
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: Arc<AlgorithmRegistry> = Arc::new(AlgorithmRegistry::new());
}

/// Retrieve the shared registry holding only the built-in algorithms.
pub fn default_registry() -> Arc<AlgorithmRegistry> {
    DEFAULT_REGISTRY.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use snafu::ResultExt;

    #[derive(Debug)]
    struct UpperAlgorithm;

    impl EncodingAlgorithm for UpperAlgorithm {
        fn uri(&self) -> Option<&str> {
            Some("urn:example:upper")
        }

        fn octets_from_string(&self, text: &str) -> Result<Vec<u8>> {
            Ok(text.to_ascii_lowercase().into_bytes())
        }

        fn string_from_octets(&self, octets: &[u8], out: &mut String) -> Result<()> {
            let text = std::str::from_utf8(octets).context(DecodeUtf8Snafu)?;
            out.push_str(&text.to_ascii_uppercase());
            Ok(())
        }
    }

    #[test]
    fn builtins_live_at_indices_one_to_ten() {
        let registry = AlgorithmRegistry::new();
        for index in 1..=10 {
            assert!(registry.get(index).is_ok(), "index {}", index);
        }
        assert!(matches!(
            registry.get(11),
            Err(Error::UnknownEncodingAlgorithm { index: 11, .. })
        ));
        assert!(matches!(
            registry.get(32),
            Err(Error::UnknownEncodingAlgorithm { .. })
        ));
    }

    #[test]
    fn extended_algorithms_start_at_thirty_two() {
        let mut registry = AlgorithmRegistry::new();
        let index = registry.register(Arc::new(UpperAlgorithm)).unwrap();
        assert_eq!(index, EXTENDED_ALGORITHM_START);
        assert_eq!(registry.index_of_uri("urn:example:upper").unwrap(), index);

        let mut out = String::new();
        registry
            .get(index)
            .unwrap()
            .string_from_octets(b"abc", &mut out)
            .unwrap();
        assert_eq!(out, "ABC");
    }
}
