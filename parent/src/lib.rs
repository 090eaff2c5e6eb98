#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(missing_docs)]
//! # Fast Infoset library
//!
//! This crate serves as a parent for the library crates of the project,
//! aggregating the modules needed to read and write Fast Infoset
//! (ITU-T X.891 / ISO/IEC 24824-1) documents.
//!
//! - The [`core`] module contains the data structures which the other
//!   crates rely on: qualified names, node events, and the vocabulary
//!   tables ([`QualifiedName`](core::QualifiedName),
//!   [`NodeEvent`](core::NodeEvent), [`Vocabulary`](core::Vocabulary)).
//! - The [`encoding`] module holds the low-level machinery: buffered
//!   octet streams, the variable-width integer codecs, restricted
//!   alphabets, and the encoding-algorithm registry.
//! - The [`parser`] module provides the document codecs: the stateful
//!   decoder and encoder, and the document-level
//!   [`DocumentReader`](parser::DocumentReader) and
//!   [`DocumentWriter`](parser::DocumentWriter).
//!
//! ## Reading
//!
//! ```no_run
//! use fastinfoset::parser::DocumentReader;
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("document.finf")?;
//! for event in DocumentReader::new(file) {
//!     println!("{}", event?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Writing
//!
//! ```
//! use fastinfoset::parser::DocumentWriter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sink = Vec::new();
//! let mut writer = DocumentWriter::new(&mut sink);
//! writer.write_start_document()?;
//! writer.write_start_element(None, "greeting", None)?;
//! writer.write_string("hello")?;
//! writer.write_end_document()?;
//! # Ok(())
//! # }
//! ```

pub use fastinfoset_core as core;
pub use fastinfoset_encoding as encoding;
pub use fastinfoset_parser as parser;

pub use fastinfoset_core::{Attribute, NodeEvent, NodeType, QualifiedName, Vocabulary};
pub use fastinfoset_parser::{DocumentReader, DocumentWriter};
