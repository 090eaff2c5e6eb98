//! Re-exports the names which virtually every user of the crate needs.
//!
//! ```
//! use fastinfoset_core::prelude::*;
//! ```

pub use crate::event::{Attribute, NodeEvent, NodeType};
pub use crate::name::QualifiedName;
pub use crate::vocabulary::{ExternalVocabulary, Vocabulary};
