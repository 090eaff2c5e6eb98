#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]
//! This crate provides the mid-level abstractions for reading and writing
//! Fast Infoset documents: the stateful decoder and encoder over the wire
//! format, and the document-level reader and writer which expose the node
//! event interface consumed by XML streaming adapters.
//!
//! For the time being, all APIs are based on synchronous I/O.

pub mod document;
pub mod namespace;
pub mod stateful;

pub use document::read::{DocumentReader, ReadState};
pub use document::write::{DocumentWriter, WriteState};
pub use document::{Declaration, ErrorKind, ReaderOptions, WriterOptions, XmlVersion};
pub use namespace::NamespaceManager;
pub use stateful::decode::StatefulDecoder;
pub use stateful::encode::StatefulEncoder;
