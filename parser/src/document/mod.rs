//! Document-level reading and writing of Fast Infoset streams.
//!
//! The types here configure the codecs and surface the language-neutral
//! error taxonomy which a poisoned stream keeps reporting.

use fastinfoset_core::vocabulary::ExternalVocabulary;
use fastinfoset_encoding::algorithm::{self, AlgorithmRegistry};
use fastinfoset_encoding::alphabet::{self, AlphabetRegistry};
use std::fmt;
use std::sync::Arc;

pub mod read;
pub mod write;

/// The XML version stated by a plaintext declaration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum XmlVersion {
    /// XML 1.0.
    V1_0,
    /// XML 1.1.
    V1_1,
}

/// Parameters of the plaintext XML declaration emitted before the magic.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// The version attribute, omitted when `None`.
    pub version: Option<XmlVersion>,
    /// The standalone attribute, omitted when `None`.
    /// `false` maps to `standalone='no'`.
    pub standalone: Option<bool>,
}

impl Declaration {
    /// The admissible declaration text for these parameters.
    pub fn text(&self) -> &'static str {
        let base = match self.version {
            None => 0,
            Some(XmlVersion::V1_0) => 3,
            Some(XmlVersion::V1_1) => 6,
        };
        let offset = match self.standalone {
            None => 0,
            Some(true) => 1,
            Some(false) => 2,
        };
        crate::stateful::DECLARATIONS[base + offset]
    }
}

/// Options of a [`StatefulDecoder`](crate::stateful::decode::StatefulDecoder)
/// or [`DocumentReader`](read::DocumentReader).
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Pre-shared vocabularies which documents may reference by URI.
    pub external_vocabularies: Vec<ExternalVocabulary>,
    /// The restricted-alphabet registry to resolve table indices with.
    pub alphabets: Arc<AlphabetRegistry>,
    /// The encoding-algorithm registry to resolve table indices with.
    pub algorithms: Arc<AlgorithmRegistry>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            external_vocabularies: Vec::new(),
            alphabets: alphabet::default_registry(),
            algorithms: algorithm::default_registry(),
        }
    }
}

/// Options of a [`StatefulEncoder`](crate::stateful::encode::StatefulEncoder)
/// or [`DocumentWriter`](write::DocumentWriter).
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Emit this plaintext XML declaration before the magic.
    pub declaration: Option<Declaration>,
    /// Reference this pre-shared vocabulary and start coding from a copy
    /// of its tables.
    pub external_vocabulary: Option<ExternalVocabulary>,
    /// Emit literal text as UTF-16BE instead of UTF-8.
    pub utf16_text: bool,
    /// The restricted-alphabet registry backing alphabet writes.
    pub alphabets: Arc<AlphabetRegistry>,
    /// The encoding-algorithm registry backing encoded-data writes.
    pub algorithms: Arc<AlgorithmRegistry>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            declaration: None,
            external_vocabulary: None,
            utf16_text: false,
            alphabets: alphabet::default_registry(),
            algorithms: algorithm::default_registry(),
        }
    }
}

/// The language-neutral kind of a codec error.
///
/// All errors are fatal to their stream: after the first failure the
/// document reader and writer keep reporting the same kind on every call
/// other than `close`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An optional document component was malformed.
    MalformedHeader,
    /// The stream does not start with the Fast Infoset magic.
    InvalidMagic,
    /// The plaintext declaration matches no admissible template.
    InvalidDeclaration,
    /// Unrecognized discriminator bits.
    InvalidIdentifier,
    /// A variable-width integer had an unknown discriminator.
    InvalidIntegerEncoding,
    /// An octet-string length had an unknown discriminator.
    InvalidLengthEncoding,
    /// The stream ended mid-document.
    UnexpectedEof,
    /// A qualified name carried a prefix without a namespace.
    InvalidQualifiedName,
    /// A restricted alphabet was malformed or misused.
    InvalidRestrictedAlphabet,
    /// A character outside the restricted alphabet was encoded.
    CharacterNotInAlphabet,
    /// An encoding-algorithm index or URI resolved to nothing.
    UnknownEncodingAlgorithm,
    /// A restricted-alphabet index resolved to nothing.
    UnknownRestrictedAlphabet,
    /// Algorithm content did not parse as its typed form.
    InvalidAlgorithmData,
    /// A literal character string was not valid in its stated encoding.
    InvalidCharacterString,
    /// A wire index pointed past the end of its vocabulary table.
    VocabularyIndexOutOfBounds,
    /// A prefix was used without a namespace binding in scope.
    UndefinedNamespaceForPrefix,
    /// A reserved namespace or prefix was rebound.
    ReservedNamespace,
    /// A writer operation was not permitted in the current state.
    InvalidState,
    /// The operation is not supported by this implementation.
    UnsupportedFeature,
    /// The underlying stream failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_templates_cover_the_nine_forms() {
        assert_eq!(Declaration::default().text(), "<?xml encoding='finf'?>");
        assert_eq!(
            Declaration {
                version: Some(XmlVersion::V1_0),
                standalone: Some(false),
            }
            .text(),
            "<?xml version='1.0' encoding='finf' standalone='no'?>"
        );
        assert_eq!(
            Declaration {
                version: Some(XmlVersion::V1_1),
                standalone: Some(true),
            }
            .text(),
            "<?xml version='1.1' encoding='finf' standalone='yes'?>"
        );
    }
}
