#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]
//! This is the core Fast Infoset library, containing the data structures
//! shared by the encoding primitives and the document codecs: qualified
//! names, node events, and the vocabulary tables which give the format its
//! compression.
//!
//! A Fast Infoset document (ITU-T X.891 / ISO/IEC 24824-1) is a binary
//! serialization of an XML infoset subset. Repeated names and strings are
//! replaced by 1-based indices into insertion-ordered vocabulary tables,
//! which both sides of the codec grow in lockstep while coding a document.

pub mod event;
pub mod name;
pub mod prelude;
pub mod vocabulary;

pub use event::{Attribute, NodeEvent, NodeType};
pub use name::QualifiedName;
pub use vocabulary::{ExternalVocabulary, Vocabulary};
