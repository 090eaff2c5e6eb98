#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]
//! Fast Infoset encoding and decoding primitives.
//!
//! This crate provides the low-level machinery under the document codecs:
//! block-buffered octet streams, the bit-position-keyed variable-width
//! integer and length codecs of X.891 annex C, restricted-alphabet string
//! packing, and the encoding-algorithm registry with the ten built-in
//! typed encodings.
//!
//! All APIs are based on synchronous I/O.

pub mod algorithm;
pub mod alphabet;
pub mod buffer;
pub mod integer;
pub mod text;

pub use algorithm::{AlgorithmRegistry, EncodingAlgorithm};
pub use alphabet::{AlphabetRegistry, RestrictedAlphabet};
pub use buffer::{BlockReader, BlockWriter};
