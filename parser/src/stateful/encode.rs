//! Stateful encoding of node content into a Fast Infoset byte stream.
//!
//! This layer owns the writer-side vocabulary and the index-or-literal
//! emission policy, and keeps the deferred-terminator bookkeeping which
//! lets a close of an attribute list, an element, or the document collapse
//! into a single `0xF0` or `0xFF` octet.

use crate::document::WriterOptions;
use crate::namespace::NamespaceDecl;
use crate::stateful::{
    vocabulary_flags, IdTable, ValueTable, DOUBLE_TERMINATOR, MAGIC, TERMINATOR,
    VALUE_INDEXING_THRESHOLD,
};
use fastinfoset_core::event::Attribute;
use fastinfoset_core::name::QualifiedName;
use fastinfoset_core::vocabulary::Vocabulary;
use fastinfoset_encoding::algorithm::AlgorithmRegistry;
use fastinfoset_encoding::alphabet::AlphabetRegistry;
use fastinfoset_encoding::buffer::BlockWriter;
use fastinfoset_encoding::{integer, text};
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::Write;
use std::sync::Arc;

/// Module-level error type:
/// for failures while emitting document content.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Qualified name {} carries a prefix but no namespace", name))]
    InvalidQualifiedName {
        name: QualifiedName,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not write to the document stream"))]
    WriteBytes {
        #[snafu(backtrace)]
        source: fastinfoset_encoding::buffer::Error,
    },

    #[snafu(display("Could not encode an integer field"))]
    EncodeInteger {
        #[snafu(backtrace)]
        source: integer::Error,
    },

    #[snafu(display("Could not encode a character string"))]
    EncodeText {
        #[snafu(backtrace)]
        source: text::Error,
    },

    #[snafu(display("Could not encode restricted-alphabet content"))]
    EncodeAlphabet {
        #[snafu(backtrace)]
        source: fastinfoset_encoding::alphabet::Error,
    },

    #[snafu(display("Could not encode algorithm content"))]
    EncodeAlgorithm {
        #[snafu(backtrace)]
        source: fastinfoset_encoding::algorithm::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// The taxonomy kind of this error, used by the document writer to
    /// report a poisoned stream.
    pub fn kind(&self) -> crate::document::ErrorKind {
        use crate::document::ErrorKind;
        match self {
            Error::InvalidQualifiedName { .. } => ErrorKind::InvalidQualifiedName,
            Error::WriteBytes { .. } => ErrorKind::Io,
            Error::EncodeInteger { source, .. } => match source {
                integer::Error::LengthOutOfRange { .. } => ErrorKind::InvalidLengthEncoding,
                _ => ErrorKind::InvalidIntegerEncoding,
            },
            Error::EncodeText { .. } => ErrorKind::InvalidCharacterString,
            Error::EncodeAlphabet { source, .. } => match source {
                fastinfoset_encoding::alphabet::Error::CharacterNotInAlphabet { .. } => {
                    ErrorKind::CharacterNotInAlphabet
                }
                fastinfoset_encoding::alphabet::Error::UnknownRestrictedAlphabet { .. } => {
                    ErrorKind::UnknownRestrictedAlphabet
                }
                _ => ErrorKind::InvalidRestrictedAlphabet,
            },
            Error::EncodeAlgorithm { source, .. } => match source {
                fastinfoset_encoding::algorithm::Error::UnknownEncodingAlgorithm { .. }
                | fastinfoset_encoding::algorithm::Error::UnknownAlgorithmUri { .. } => {
                    ErrorKind::UnknownEncodingAlgorithm
                }
                _ => ErrorKind::InvalidAlgorithmData,
            },
        }
    }
}

/// Deferred terminators not yet committed to the stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Pending {
    None,
    Single,
    Double,
}

/// A stateful encoder of one Fast Infoset document.
#[derive(Debug)]
pub struct StatefulEncoder<W> {
    writer: BlockWriter<W>,
    vocabulary: Vocabulary,
    alphabets: Arc<AlphabetRegistry>,
    algorithms: Arc<AlgorithmRegistry>,
    pending: Pending,
    utf16_text: bool,
}

impl<W> StatefulEncoder<W>
where
    W: Write,
{
    /// Create an encoder over the given sink with default options.
    pub fn new(sink: W) -> Self {
        StatefulEncoder::new_with_options(sink, &WriterOptions::default())
    }

    /// Create an encoder over the given sink.
    pub fn new_with_options(sink: W, options: &WriterOptions) -> Self {
        let vocabulary = match &options.external_vocabulary {
            Some(external) => external.instantiate(),
            None => Vocabulary::new(),
        };
        StatefulEncoder {
            writer: BlockWriter::new(sink),
            vocabulary,
            alphabets: options.alphabets.clone(),
            algorithms: options.algorithms.clone(),
            pending: Pending::None,
            utf16_text: options.utf16_text,
        }
    }

    /// The absolute number of octets emitted so far.
    pub fn position(&self) -> u64 {
        self.writer.position()
    }

    /// The encoder's vocabulary, as grown so far.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Emit the document header: the optional plaintext declaration, the
    /// magic, and the optional initial vocabulary reference.
    pub fn write_header(
        &mut self,
        declaration: Option<&str>,
        external_vocabulary_uri: Option<&str>,
    ) -> Result<()> {
        if let Some(declaration) = declaration {
            self.writer
                .write_bytes(declaration.as_bytes())
                .context(WriteBytesSnafu)?;
        }
        self.writer.write_bytes(&MAGIC).context(WriteBytesSnafu)?;
        let flags = match external_vocabulary_uri {
            Some(_) => crate::stateful::document_flags::INITIAL_VOCABULARY,
            None => 0,
        };
        self.writer.write_byte(flags).context(WriteBytesSnafu)?;
        if let Some(uri) = external_vocabulary_uri {
            self.writer
                .write_byte(vocabulary_flags::EXTERNAL_VOCABULARY)
                .context(WriteBytesSnafu)?;
            self.writer.write_byte(0x00).context(WriteBytesSnafu)?;
            integer::write_len_bit2(&mut self.writer, 0x00, uri.len() as u64)
                .context(EncodeIntegerSnafu)?;
            self.writer
                .write_bytes(uri.as_bytes())
                .context(WriteBytesSnafu)?;
        }
        Ok(())
    }

    /// Emit an element start: the namespace attribute block, the qualified
    /// name or its index, and the attribute list. The attribute list
    /// terminator is deferred.
    pub fn write_element_start(
        &mut self,
        name: &QualifiedName,
        namespaces: &[NamespaceDecl],
        attributes: &[Attribute],
    ) -> Result<()> {
        self.commit_pending()?;
        let attribute_flag = if attributes.is_empty() { 0x00 } else { 0x40 };
        if namespaces.is_empty() {
            self.write_element_qname(attribute_flag, name)?;
        } else {
            self.writer
                .write_byte(attribute_flag | 0x38)
                .context(WriteBytesSnafu)?;
            for declaration in namespaces {
                let mut octet = 0xCC;
                if !declaration.prefix.is_empty() {
                    octet |= 0x02;
                }
                if !declaration.uri.is_empty() {
                    octet |= 0x01;
                }
                self.writer.write_byte(octet).context(WriteBytesSnafu)?;
                if !declaration.prefix.is_empty() {
                    self.write_identifying(IdTable::Prefix, &declaration.prefix)?;
                }
                if !declaration.uri.is_empty() {
                    self.write_identifying(IdTable::NamespaceName, &declaration.uri)?;
                }
            }
            self.writer.write_byte(TERMINATOR).context(WriteBytesSnafu)?;
            self.write_element_qname(0x00, name)?;
        }
        for attribute in attributes {
            self.write_attribute_qname(&attribute.name)?;
            self.write_non_identifying_bit1(ValueTable::AttributeValue, &attribute.value)?;
        }
        if !attributes.is_empty() {
            self.pending = Pending::Single;
        }
        Ok(())
    }

    /// Defer an element close, collapsing with already-deferred
    /// terminators where possible.
    pub fn write_end_element(&mut self) -> Result<()> {
        self.pending = match self.pending {
            Pending::None => Pending::Single,
            Pending::Single => Pending::Double,
            Pending::Double => {
                self.writer
                    .write_byte(DOUBLE_TERMINATOR)
                    .context(WriteBytesSnafu)?;
                Pending::Single
            }
        };
        Ok(())
    }

    /// Close the document, committing any deferred terminators.
    pub fn write_end_document(&mut self) -> Result<()> {
        match self.pending {
            Pending::None => self
                .writer
                .write_byte(TERMINATOR)
                .context(WriteBytesSnafu)?,
            Pending::Single => self
                .writer
                .write_byte(DOUBLE_TERMINATOR)
                .context(WriteBytesSnafu)?,
            Pending::Double => {
                self.writer
                    .write_byte(DOUBLE_TERMINATOR)
                    .context(WriteBytesSnafu)?;
                self.writer
                    .write_byte(TERMINATOR)
                    .context(WriteBytesSnafu)?;
            }
        }
        self.pending = Pending::None;
        Ok(())
    }

    /// Emit a character chunk, indexing it per the vocabulary policy.
    pub fn write_character_chunk(&mut self, content: &str) -> Result<()> {
        if content.is_empty() {
            return Ok(());
        }
        self.commit_pending()?;
        if content.chars().count() < VALUE_INDEXING_THRESHOLD {
            if let Some(index) = self.vocabulary.character_chunks.get(content) {
                return integer::write_nonzero_bit4(&mut self.writer, 0xA0, index)
                    .context(EncodeIntegerSnafu);
            }
            if self.vocabulary.character_chunks.insert(content).is_none() {
                tracing::warn!("content character chunk table is full, coding literally");
            }
            self.write_literal_chunk(0x10, content)
        } else {
            self.write_literal_chunk(0x00, content)
        }
    }

    fn write_literal_chunk(&mut self, add_flag: u8, content: &str) -> Result<()> {
        let (encoding_bits, octets) = if self.utf16_text {
            (0x04, text::encode_utf16be(content).context(EncodeTextSnafu)?)
        } else {
            (0x00, content.as_bytes().to_vec())
        };
        let identifier = 0x80 | add_flag | encoding_bits;
        integer::write_len_bit7(&mut self.writer, identifier, octets.len() as u64)
            .context(EncodeIntegerSnafu)?;
        self.writer.write_bytes(&octets).context(WriteBytesSnafu)
    }

    /// Emit a character chunk packed with the restricted alphabet at the
    /// given table index.
    pub fn write_restricted_chunk(&mut self, alphabet: u32, content: &str) -> Result<()> {
        if content.is_empty() {
            return Ok(());
        }
        let mut octets = Vec::new();
        self.alphabets
            .get(alphabet)
            .context(EncodeAlphabetSnafu)?
            .encode(content, &mut octets)
            .context(EncodeAlphabetSnafu)?;
        self.commit_pending()?;
        let id = alphabet - 1;
        self.writer
            .write_byte(0x80 | 0x08 | (id >> 6) as u8)
            .context(WriteBytesSnafu)?;
        integer::write_len_bit7(
            &mut self.writer,
            ((id & 0x3F) as u8) << 2,
            octets.len() as u64,
        )
        .context(EncodeIntegerSnafu)?;
        self.writer.write_bytes(&octets).context(WriteBytesSnafu)
    }

    /// Emit algorithm content under the given algorithm table index.
    pub fn write_encoded_chunk(&mut self, algorithm: u32, octets: &[u8]) -> Result<()> {
        // resolve first so an unknown index fails before any emission
        self.algorithms.get(algorithm).context(EncodeAlgorithmSnafu)?;
        self.commit_pending()?;
        let id = algorithm - 1;
        self.writer
            .write_byte(0x80 | 0x0C | (id >> 6) as u8)
            .context(WriteBytesSnafu)?;
        integer::write_len_bit7(
            &mut self.writer,
            ((id & 0x3F) as u8) << 2,
            octets.len() as u64,
        )
        .context(EncodeIntegerSnafu)?;
        self.writer.write_bytes(octets).context(WriteBytesSnafu)
    }

    /// Emit a comment.
    pub fn write_comment(&mut self, content: &str) -> Result<()> {
        self.commit_pending()?;
        self.writer.write_byte(0xE2).context(WriteBytesSnafu)?;
        self.write_non_identifying_bit1(ValueTable::OtherString, content)
    }

    /// Emit a processing instruction.
    pub fn write_processing_instruction(&mut self, target: &str, content: &str) -> Result<()> {
        self.commit_pending()?;
        self.writer.write_byte(0xE1).context(WriteBytesSnafu)?;
        self.write_identifying(IdTable::OtherNcName, target)?;
        self.write_non_identifying_bit1(ValueTable::OtherString, content)
    }

    /// Deliver all buffered octets and flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context(WriteBytesSnafu)
    }

    /// Flush and recover the underlying sink.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().context(WriteBytesSnafu)
    }

    fn commit_pending(&mut self) -> Result<()> {
        match self.pending {
            Pending::None => {}
            Pending::Single => self
                .writer
                .write_byte(TERMINATOR)
                .context(WriteBytesSnafu)?,
            Pending::Double => self
                .writer
                .write_byte(DOUBLE_TERMINATOR)
                .context(WriteBytesSnafu)?,
        }
        self.pending = Pending::None;
        Ok(())
    }

    fn write_element_qname(&mut self, identifier: u8, name: &QualifiedName) -> Result<()> {
        if let Some(index) = self.vocabulary.element_names.get(name) {
            return integer::write_nonzero_bit3(&mut self.writer, identifier, index)
                .context(EncodeIntegerSnafu);
        }
        self.write_literal_qname(identifier | 0x3C, name)?;
        if self.vocabulary.element_names.insert(name).is_none() {
            tracing::warn!("element name table is full, coding literally");
        }
        Ok(())
    }

    fn write_attribute_qname(&mut self, name: &QualifiedName) -> Result<()> {
        if let Some(index) = self.vocabulary.attribute_names.get(name) {
            return integer::write_nonzero_bit2(&mut self.writer, 0x00, index)
                .context(EncodeIntegerSnafu);
        }
        self.write_literal_qname(0x78, name)?;
        if self.vocabulary.attribute_names.insert(name).is_none() {
            tracing::warn!("attribute name table is full, coding literally");
        }
        Ok(())
    }

    fn write_literal_qname(&mut self, marker: u8, name: &QualifiedName) -> Result<()> {
        snafu::ensure!(
            !name.has_prefix() || name.has_namespace(),
            InvalidQualifiedNameSnafu { name: name.clone() }
        );
        let mut octet = marker;
        if name.has_prefix() {
            octet |= 0x02;
        }
        if name.has_namespace() {
            octet |= 0x01;
        }
        self.writer.write_byte(octet).context(WriteBytesSnafu)?;
        if name.has_prefix() {
            self.write_identifying(IdTable::Prefix, &name.prefix)?;
        }
        if name.has_namespace() {
            self.write_identifying(IdTable::NamespaceName, &name.namespace_uri)?;
        }
        self.write_identifying(IdTable::LocalName, &name.local_name)
    }

    /// Emit an identifying string: its table index on a hit, otherwise a
    /// literal which both sides insert.
    fn write_identifying(&mut self, table: IdTable, value: &str) -> Result<()> {
        let existing = match table {
            IdTable::Prefix => self.vocabulary.prefixes.get(value),
            IdTable::NamespaceName => self.vocabulary.namespace_names.get(value),
            IdTable::LocalName => self.vocabulary.local_names.get(value),
            IdTable::OtherNcName => self.vocabulary.other_ncnames.get(value),
            IdTable::OtherUri => self.vocabulary.other_uris.get(value),
        };
        if let Some(index) = existing {
            return integer::write_nonzero_bit2(&mut self.writer, 0x80, index)
                .context(EncodeIntegerSnafu);
        }
        integer::write_len_bit2(&mut self.writer, 0x00, value.len() as u64)
            .context(EncodeIntegerSnafu)?;
        self.writer
            .write_bytes(value.as_bytes())
            .context(WriteBytesSnafu)?;
        let inserted = match table {
            IdTable::Prefix => self.vocabulary.prefixes.insert(value),
            IdTable::NamespaceName => self.vocabulary.namespace_names.insert(value),
            IdTable::LocalName => self.vocabulary.local_names.insert(value),
            IdTable::OtherNcName => self.vocabulary.other_ncnames.insert(value),
            IdTable::OtherUri => self.vocabulary.other_uris.insert(value),
        };
        if inserted.is_none() {
            tracing::warn!("{} table is full, coding literally", table.label());
        }
        Ok(())
    }

    /// Emit a non-identifying string: a zero index for the empty string,
    /// an index on a table hit, or a literal. Short literals enter the
    /// table; literals at or above the indexing threshold bypass it.
    fn write_non_identifying_bit1(&mut self, table: ValueTable, value: &str) -> Result<()> {
        if value.is_empty() {
            return integer::write_zero_bit2(&mut self.writer, 0x80, 0)
                .context(EncodeIntegerSnafu);
        }
        let mut add_flag = 0x00;
        if value.chars().count() < VALUE_INDEXING_THRESHOLD {
            let existing = match table {
                ValueTable::AttributeValue => self.vocabulary.attribute_values.get(value),
                ValueTable::OtherString => self.vocabulary.other_strings.get(value),
            };
            if let Some(index) = existing {
                return integer::write_nonzero_bit2(&mut self.writer, 0x80, index)
                    .context(EncodeIntegerSnafu);
            }
            let inserted = match table {
                ValueTable::AttributeValue => self.vocabulary.attribute_values.insert(value),
                ValueTable::OtherString => self.vocabulary.other_strings.insert(value),
            };
            if inserted.is_none() {
                tracing::warn!("{} table is full, coding literally", table.label());
            }
            add_flag = 0x40;
        }
        let (encoding_bits, octets) = if self.utf16_text {
            (0x10, text::encode_utf16be(value).context(EncodeTextSnafu)?)
        } else {
            (0x00, value.as_bytes().to_vec())
        };
        integer::write_len_bit5(
            &mut self.writer,
            add_flag | encoding_bits,
            octets.len() as u64,
        )
        .context(EncodeIntegerSnafu)?;
        self.writer.write_bytes(&octets).context(WriteBytesSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastinfoset_encoding::algorithm::indices;

    fn encoder_to_vec() -> StatefulEncoder<Vec<u8>> {
        StatefulEncoder::new(Vec::new())
    }

    #[test]
    fn minimal_document_bytes() {
        let mut encoder = encoder_to_vec();
        encoder.write_header(None, None).unwrap();
        encoder
            .write_element_start(&QualifiedName::unqualified("a"), &[], &[])
            .unwrap();
        encoder.write_end_element().unwrap();
        encoder.write_end_document().unwrap();
        let bytes = encoder.into_inner().unwrap();
        // the deferred element close and the document close collapse
        assert_eq!(
            bytes,
            vec![0xE0, 0x00, 0x00, 0x01, 0x00, 0x3C, 0x00, b'a', 0xFF]
        );
    }

    #[test]
    fn repeated_names_are_indexed() {
        let mut encoder = encoder_to_vec();
        encoder.write_header(None, None).unwrap();
        let name = QualifiedName::unqualified("x");
        let attribute = Attribute::new(QualifiedName::unqualified("a"), "v");
        for _ in 0..2 {
            encoder
                .write_element_start(&name, &[], std::slice::from_ref(&attribute))
                .unwrap();
            encoder.write_end_element().unwrap();
        }
        encoder.write_end_document().unwrap();
        let bytes = encoder.into_inner().unwrap();
        assert_eq!(
            bytes,
            vec![
                0xE0, 0x00, 0x00, 0x01, 0x00, // header
                0x7C, 0x00, b'x', // element with attributes, literal "x"
                0x78, 0x00, b'a', // attribute, literal "a"
                0x40, b'v', // value "v", added to the table
                0xFF, // end attributes + element close
                0x40, // element with attributes, name index 1
                0x00, // attribute name index 1
                0x80, // value index 1
                0xFF, // end attributes + element close
                0xF0, // end of document
            ]
        );
    }

    #[test]
    fn nested_close_collapses_into_a_double_terminator() {
        let mut encoder = encoder_to_vec();
        encoder.write_header(None, None).unwrap();
        encoder
            .write_element_start(&QualifiedName::unqualified("a"), &[], &[])
            .unwrap();
        encoder
            .write_element_start(&QualifiedName::unqualified("b"), &[], &[])
            .unwrap();
        encoder.write_end_element().unwrap();
        encoder.write_end_element().unwrap();
        encoder.write_end_document().unwrap();
        let bytes = encoder.into_inner().unwrap();
        assert_eq!(
            bytes,
            vec![
                0xE0, 0x00, 0x00, 0x01, 0x00, // header
                0x3C, 0x00, b'a', // <a>
                0x3C, 0x00, b'b', // <b>
                0xFF, // close b and a
                0xF0, // end of document
            ]
        );
    }

    #[test]
    fn long_content_bypasses_the_chunk_table() {
        let mut encoder = encoder_to_vec();
        encoder.write_header(None, None).unwrap();
        encoder
            .write_element_start(&QualifiedName::unqualified("x"), &[], &[])
            .unwrap();
        let long: String = std::iter::repeat('s').take(60).collect();
        encoder.write_character_chunk(&long).unwrap();
        encoder.write_end_element().unwrap();
        encoder.write_end_document().unwrap();
        assert!(encoder.vocabulary().character_chunks.is_empty());

        let bytes = encoder.into_inner().unwrap();
        // literal chunk without the add-to-table bit
        assert_eq!(bytes[8], 0x82);
        assert_eq!(bytes[9], 60 - 3);
    }

    #[test]
    fn encoded_chunk_carries_the_algorithm_index() {
        let mut encoder = encoder_to_vec();
        encoder.write_header(None, None).unwrap();
        encoder
            .write_element_start(&QualifiedName::unqualified("x"), &[], &[])
            .unwrap();
        let payload = [0x00, 0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF];
        encoder.write_encoded_chunk(indices::INT, &payload).unwrap();
        encoder.write_end_element().unwrap();
        encoder.write_end_document().unwrap();
        let bytes = encoder.into_inner().unwrap();
        // int is table index 4, so the wire identifier is 3
        assert_eq!(&bytes[8..11], &[0x8C, 0x0E, 0x05]);
        assert_eq!(&bytes[11..19], &payload);
        assert_eq!(&bytes[19..], &[0xFF]);
    }

    #[test]
    fn restricted_chunk_packs_with_the_numeric_alphabet() {
        use fastinfoset_encoding::alphabet::NUMERIC_ALPHABET;
        let mut encoder = encoder_to_vec();
        encoder.write_header(None, None).unwrap();
        encoder
            .write_element_start(&QualifiedName::unqualified("x"), &[], &[])
            .unwrap();
        encoder
            .write_restricted_chunk(NUMERIC_ALPHABET, "3.14e0")
            .unwrap();
        encoder.write_end_element().unwrap();
        encoder.write_end_document().unwrap();
        let bytes = encoder.into_inner().unwrap();
        // alphabet identifier 0, then the length 3 in its medium form
        assert_eq!(&bytes[8..14], &[0x88, 0x02, 0x00, 0x3C, 0x14, 0xD0]);
    }

    #[test]
    fn namespace_attributes_precede_the_name() {
        let mut encoder = encoder_to_vec();
        encoder.write_header(None, None).unwrap();
        encoder
            .write_element_start(
                &QualifiedName::new("p", "u", "r"),
                &[NamespaceDecl {
                    prefix: "p".into(),
                    uri: "u".into(),
                }],
                &[],
            )
            .unwrap();
        encoder.write_end_element().unwrap();
        encoder.write_end_document().unwrap();
        let bytes = encoder.into_inner().unwrap();
        assert_eq!(
            bytes,
            vec![
                0xE0, 0x00, 0x00, 0x01, 0x00, // header
                0x38, // element with namespace attributes
                0xCF, 0x00, b'p', 0x00, b'u', // xmlns:p="u"
                0xF0, // end of namespace attributes
                0x3F, // literal name with prefix and namespace
                0x81, // prefix index 2
                0x81, // namespace index 2
                0x00, b'r', // local name "r"
                0xFF, // element close + end of document
            ]
        );
    }

    #[test]
    fn empty_strings_use_the_zero_index() {
        let mut encoder = encoder_to_vec();
        encoder.write_header(None, None).unwrap();
        encoder
            .write_element_start(
                &QualifiedName::unqualified("x"),
                &[],
                &[Attribute::new(QualifiedName::unqualified("a"), "")],
            )
            .unwrap();
        encoder.write_end_element().unwrap();
        encoder.write_end_document().unwrap();
        let bytes = encoder.into_inner().unwrap();
        // ... attribute name, then the empty value as 0xFF
        assert_eq!(&bytes[8..], &[0x78, 0x00, b'a', 0xFF, 0xFF, 0xF0]);
    }
}
