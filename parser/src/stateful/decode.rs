//! Stateful decoding of a Fast Infoset byte stream into node events.
//!
//! The decoder is strictly sequential: it dispatches on the identifier
//! bits of each item and never looks ahead of the octet being decoded.
//! Vocabulary tables are grown exactly as the producing encoder grew
//! them, so that wire indices resolve to the same entries on both sides.

use crate::document::ReaderOptions;
use crate::stateful::{
    document_flags, vocabulary_flags, IdTable, ValueTable, DECLARATIONS, DOUBLE_TERMINATOR, MAGIC,
    TERMINATOR,
};
use fastinfoset_core::event::{Attribute, NodeEvent, NodeType};
use fastinfoset_core::name::{QualifiedName, XMLNS_NAMESPACE_URI, XMLNS_PREFIX};
use fastinfoset_core::vocabulary::{ExternalVocabulary, Vocabulary};
use fastinfoset_encoding::algorithm::{self, AlgorithmRegistry};
use fastinfoset_encoding::alphabet::{
    AlphabetRegistry, RestrictedAlphabet, EXTENDED_ALPHABET_START,
};
use fastinfoset_encoding::buffer::BlockReader;
use fastinfoset_encoding::{integer, text};
use smallvec::SmallVec;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

/// Module-level error type:
/// for malformed documents and failures of the layers below.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Malformed document header: {}", message))]
    MalformedHeader {
        message: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Stream does not start with the Fast Infoset magic"))]
    InvalidMagic { backtrace: Backtrace },

    #[snafu(display("Unrecognized XML declaration before the magic"))]
    InvalidDeclaration { backtrace: Backtrace },

    #[snafu(display("Unrecognized item identifier {:#04x} at position {}", octet, position))]
    InvalidIdentifier {
        octet: u8,
        position: u64,
        backtrace: Backtrace,
    },

    #[snafu(display("Qualified name carries a prefix but no namespace at position {}", position))]
    InvalidQualifiedName { position: u64, backtrace: Backtrace },

    #[snafu(display("No entry at index {} of the {} table", index, table))]
    VocabularyIndexOutOfBounds {
        index: u32,
        table: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("No external vocabulary registered for URI {}", uri))]
    UnresolvedExternalVocabulary { uri: String, backtrace: Backtrace },

    #[snafu(display("Could not read from the document stream"))]
    ReadBytes {
        #[snafu(backtrace)]
        source: fastinfoset_encoding::buffer::Error,
    },

    #[snafu(display("Could not decode an integer field"))]
    DecodeInteger {
        #[snafu(backtrace)]
        source: integer::Error,
    },

    #[snafu(display("Could not decode a character string"))]
    DecodeText {
        #[snafu(backtrace)]
        source: text::Error,
    },

    #[snafu(display("Could not decode restricted-alphabet content"))]
    DecodeAlphabet {
        #[snafu(backtrace)]
        source: fastinfoset_encoding::alphabet::Error,
    },

    #[snafu(display("Could not decode algorithm content"))]
    DecodeAlgorithm {
        #[snafu(backtrace)]
        source: algorithm::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A notation declared in the document header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notation {
    /// The notation name.
    pub name: String,
    /// The system identifier, or empty.
    pub system_id: String,
    /// The public identifier, or empty.
    pub public_id: String,
}

/// An unparsed entity declared in the document header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparsedEntity {
    /// The entity name.
    pub name: String,
    /// The system identifier.
    pub system_id: String,
    /// The public identifier, or empty.
    pub public_id: String,
    /// The name of the notation describing the entity.
    pub notation_name: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PendingClose {
    None,
    Element,
    Document,
}

/// A stateful decoder of one Fast Infoset document.
#[derive(Debug)]
pub struct StatefulDecoder<R> {
    reader: BlockReader<R>,
    vocabulary: Vocabulary,
    alphabets: Arc<AlphabetRegistry>,
    algorithms: Arc<AlgorithmRegistry>,
    external: HashMap<String, ExternalVocabulary>,
    /// alphabets supplied by this document's initial vocabulary,
    /// occupying indices 16 and up ahead of the registry
    local_alphabets: Vec<RestrictedAlphabet>,
    /// algorithm URIs supplied by this document's initial vocabulary,
    /// occupying indices 32 and up
    local_algorithm_uris: Vec<String>,
    element_stack: Vec<QualifiedName>,
    pending: PendingClose,
    started: bool,
    finished: bool,
    scratch: Vec<u8>,
    declaration: Option<String>,
    version: Option<String>,
    standalone: Option<bool>,
    character_encoding_scheme: Option<String>,
    notations: Vec<Notation>,
    unparsed_entities: Vec<UnparsedEntity>,
}

impl<R> StatefulDecoder<R>
where
    R: Read,
{
    /// Create a decoder over the given source with default options.
    pub fn new(source: R) -> Self {
        StatefulDecoder::new_with_options(source, ReaderOptions::default())
    }

    /// Create a decoder over the given source.
    pub fn new_with_options(source: R, options: ReaderOptions) -> Self {
        let external = options
            .external_vocabularies
            .into_iter()
            .map(|v| (v.uri().to_owned(), v))
            .collect();
        StatefulDecoder {
            reader: BlockReader::new(source),
            vocabulary: Vocabulary::new(),
            alphabets: options.alphabets,
            algorithms: options.algorithms,
            external,
            local_alphabets: Vec::new(),
            local_algorithm_uris: Vec::new(),
            element_stack: Vec::new(),
            pending: PendingClose::None,
            started: false,
            finished: false,
            scratch: Vec::with_capacity(1024),
            declaration: None,
            version: None,
            standalone: None,
            character_encoding_scheme: None,
            notations: Vec::new(),
            unparsed_entities: Vec::new(),
        }
    }

    /// The absolute octet position of the decoder in the stream.
    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    /// The plaintext XML declaration found before the magic, if any.
    pub fn declaration(&self) -> Option<&str> {
        self.declaration.as_deref()
    }

    /// The XML version stated by the document, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The standalone flag stated by the document, if any.
    pub fn standalone(&self) -> Option<bool> {
        self.standalone
    }

    /// The character encoding scheme stated by the document, if any.
    pub fn character_encoding_scheme(&self) -> Option<&str> {
        self.character_encoding_scheme.as_deref()
    }

    /// The notations declared by the document header.
    pub fn notations(&self) -> &[Notation] {
        &self.notations
    }

    /// The unparsed entities declared by the document header.
    pub fn unparsed_entities(&self) -> &[UnparsedEntity] {
        &self.unparsed_entities
    }

    /// The decoder's vocabulary, as grown so far.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Decode the next node event, or `None` once the document has ended.
    pub fn read_event(&mut self) -> Result<Option<NodeEvent>> {
        if !self.started {
            self.decode_document_start()?;
            self.started = true;
        }
        if self.finished {
            return Ok(None);
        }
        match self.pending {
            PendingClose::Element => {
                self.pending = PendingClose::None;
                return Ok(Some(self.end_element_event()));
            }
            PendingClose::Document => {
                self.pending = PendingClose::None;
                self.finished = true;
                return Ok(Some(NodeEvent::of(NodeType::EndDocument, 0)));
            }
            PendingClose::None => {}
        }
        self.decode_item().map(Some)
    }

    fn end_element_event(&mut self) -> NodeEvent {
        // the stack is never empty when a close is pending
        let name = self.element_stack.pop().unwrap_or_default();
        let mut event = NodeEvent::of(NodeType::EndElement, self.element_stack.len() as u32);
        event.name = name;
        event
    }

    fn depth(&self) -> u32 {
        self.element_stack.len() as u32
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.reader.read_byte().context(ReadBytesSnafu)
    }

    fn invalid_identifier<T>(&self, octet: u8) -> Result<T> {
        InvalidIdentifierSnafu {
            octet,
            position: self.reader.position(),
        }
        .fail()
    }

    fn decode_item(&mut self) -> Result<NodeEvent> {
        let octet = self.read_byte()?;
        match octet {
            0x00..=0x7F => self.decode_element(octet),
            0x80..=0xBF => {
                if self.element_stack.is_empty() {
                    self.invalid_identifier(octet)
                } else {
                    self.decode_character_chunk(octet)
                }
            }
            0xE1 => self.decode_processing_instruction(),
            0xE2 => self.decode_comment(),
            _ if octet >> 2 == 0x31 => self.decode_document_type(octet),
            _ if octet >> 2 == 0x32 => self.decode_entity_reference(octet),
            TERMINATOR => {
                if self.element_stack.is_empty() {
                    self.finished = true;
                    Ok(NodeEvent::of(NodeType::EndDocument, 0))
                } else {
                    Ok(self.end_element_event())
                }
            }
            DOUBLE_TERMINATOR => {
                if self.element_stack.is_empty() {
                    self.finished = true;
                    Ok(NodeEvent::of(NodeType::EndDocument, 0))
                } else {
                    let event = self.end_element_event();
                    self.pending = if self.element_stack.is_empty() {
                        PendingClose::Document
                    } else {
                        PendingClose::Element
                    };
                    Ok(event)
                }
            }
            _ => self.invalid_identifier(octet),
        }
    }

    fn decode_element(&mut self, octet: u8) -> Result<NodeEvent> {
        let depth = self.depth();
        let has_attributes = octet & 0x40 != 0;
        let mut attributes: SmallVec<[Attribute; 8]> = SmallVec::new();

        let qname_octet = if octet & 0x3C == 0x38 {
            // namespace attributes precede the qualified name
            loop {
                let b = self.read_byte()?;
                if b & 0xFC == 0xCC {
                    let prefix = if b & 0x02 != 0 {
                        self.read_identifying(IdTable::Prefix)?
                    } else {
                        String::new()
                    };
                    let uri = if b & 0x01 != 0 {
                        self.read_identifying(IdTable::NamespaceName)?
                    } else {
                        String::new()
                    };
                    let name = if prefix.is_empty() {
                        QualifiedName::new("", XMLNS_NAMESPACE_URI, XMLNS_PREFIX)
                    } else {
                        QualifiedName::new(XMLNS_PREFIX, XMLNS_NAMESPACE_URI, prefix)
                    };
                    attributes.push(Attribute::new(name, uri));
                } else if b == TERMINATOR {
                    break;
                } else {
                    return self.invalid_identifier(b);
                }
            }
            self.read_byte()?
        } else {
            octet
        };

        let name = if qname_octet & 0x3C == 0x3C {
            self.read_literal_qname(qname_octet, true)?
        } else {
            let index = integer::read_nonzero_bit3(&mut self.reader, qname_octet)
                .context(DecodeIntegerSnafu)?;
            self.vocabulary
                .element_names
                .resolve(index)
                .cloned()
                .context(VocabularyIndexOutOfBoundsSnafu {
                    index,
                    table: "element name",
                })?
        };

        let mut close_now = false;
        if has_attributes {
            loop {
                let b = self.read_byte()?;
                if b < 0x80 {
                    let name = if b & 0x7C == 0x78 {
                        self.read_literal_qname(b, false)?
                    } else {
                        let index = integer::read_nonzero_bit2(&mut self.reader, b)
                            .context(DecodeIntegerSnafu)?;
                        self.vocabulary
                            .attribute_names
                            .resolve(index)
                            .cloned()
                            .context(VocabularyIndexOutOfBoundsSnafu {
                                index,
                                table: "attribute name",
                            })?
                    };
                    let value = self.read_non_identifying_bit1(ValueTable::AttributeValue)?;
                    attributes.push(Attribute::new(name, value));
                } else if b == TERMINATOR {
                    break;
                } else if b == DOUBLE_TERMINATOR {
                    close_now = true;
                    break;
                } else {
                    return self.invalid_identifier(b);
                }
            }
        }

        self.element_stack.push(name.clone());
        if close_now {
            self.pending = PendingClose::Element;
        }

        let mut event = NodeEvent::of(NodeType::Element, depth);
        event.name = name;
        event.attributes = attributes;
        Ok(event)
    }

    /// Decode a literal qualified name whose flag bits sit in the low two
    /// bits of `octet`, inserting it into the element or attribute name
    /// table.
    fn read_literal_qname(&mut self, octet: u8, element: bool) -> Result<QualifiedName> {
        let has_prefix = octet & 0x02 != 0;
        let has_namespace = octet & 0x01 != 0;
        if has_prefix && !has_namespace {
            return InvalidQualifiedNameSnafu {
                position: self.reader.position(),
            }
            .fail();
        }
        let prefix = if has_prefix {
            self.read_identifying(IdTable::Prefix)?
        } else {
            String::new()
        };
        let namespace_uri = if has_namespace {
            self.read_identifying(IdTable::NamespaceName)?
        } else {
            String::new()
        };
        let local_name = self.read_identifying(IdTable::LocalName)?;
        let name = QualifiedName::new(prefix, namespace_uri, local_name);
        let table = if element {
            &mut self.vocabulary.element_names
        } else {
            &mut self.vocabulary.attribute_names
        };
        if table.insert(&name).is_none() {
            tracing::warn!("{} name table is full, coding literally", if element { "element" } else { "attribute" });
        }
        Ok(name)
    }

    /// Decode an identifying string or index over the given table.
    /// Literal occurrences are always inserted.
    fn read_identifying(&mut self, table: IdTable) -> Result<String> {
        let octet = self.read_byte()?;
        if octet & 0x80 != 0 {
            let index =
                integer::read_nonzero_bit2(&mut self.reader, octet).context(DecodeIntegerSnafu)?;
            return self
                .id_table(table)
                .resolve(index)
                .map(str::to_owned)
                .context(VocabularyIndexOutOfBoundsSnafu {
                    index,
                    table: table.label(),
                });
        }
        let length = integer::read_len_bit2(&mut self.reader, octet).context(DecodeIntegerSnafu)?;
        self.scratch.clear();
        self.reader
            .read_into(length as usize, &mut self.scratch)
            .context(ReadBytesSnafu)?;
        let value = text::decode_utf8(&self.scratch).context(DecodeTextSnafu)?;
        if self.id_table_mut(table).insert(&value).is_none() {
            tracing::warn!("{} table is full, coding literally", table.label());
        }
        Ok(value)
    }

    fn id_table(&self, table: IdTable) -> &fastinfoset_core::vocabulary::StringTable {
        match table {
            IdTable::Prefix => &self.vocabulary.prefixes,
            IdTable::NamespaceName => &self.vocabulary.namespace_names,
            IdTable::LocalName => &self.vocabulary.local_names,
            IdTable::OtherNcName => &self.vocabulary.other_ncnames,
            IdTable::OtherUri => &self.vocabulary.other_uris,
        }
    }

    fn id_table_mut(&mut self, table: IdTable) -> &mut fastinfoset_core::vocabulary::StringTable {
        match table {
            IdTable::Prefix => &mut self.vocabulary.prefixes,
            IdTable::NamespaceName => &mut self.vocabulary.namespace_names,
            IdTable::LocalName => &mut self.vocabulary.local_names,
            IdTable::OtherNcName => &mut self.vocabulary.other_ncnames,
            IdTable::OtherUri => &mut self.vocabulary.other_uris,
        }
    }

    fn value_table_mut(
        &mut self,
        table: ValueTable,
    ) -> &mut fastinfoset_core::vocabulary::StringTable {
        match table {
            ValueTable::AttributeValue => &mut self.vocabulary.attribute_values,
            ValueTable::OtherString => &mut self.vocabulary.other_strings,
        }
    }

    /// Decode a non-identifying string or index whose form starts on the
    /// first bit of a fresh octet (attribute values, comment and
    /// processing instruction content, version strings).
    fn read_non_identifying_bit1(&mut self, table: ValueTable) -> Result<String> {
        let octet = self.read_byte()?;
        if octet & 0x80 != 0 {
            let index =
                integer::read_zero_bit2(&mut self.reader, octet).context(DecodeIntegerSnafu)?;
            if index == 0 {
                return Ok(String::new());
            }
            let resolved = match table {
                ValueTable::AttributeValue => self.vocabulary.attribute_values.resolve(index),
                ValueTable::OtherString => self.vocabulary.other_strings.resolve(index),
            };
            return resolved
                .map(str::to_owned)
                .context(VocabularyIndexOutOfBoundsSnafu {
                    index,
                    table: table.label(),
                });
        }
        let add = octet & 0x40 != 0;
        let value = match octet & 0x30 {
            0x00 => {
                let length =
                    integer::read_len_bit5(&mut self.reader, octet).context(DecodeIntegerSnafu)?;
                self.read_scratch(length as usize)?;
                text::decode_utf8(&self.scratch).context(DecodeTextSnafu)?
            }
            0x10 => {
                let length =
                    integer::read_len_bit5(&mut self.reader, octet).context(DecodeIntegerSnafu)?;
                self.read_scratch(length as usize)?;
                text::decode_utf16be(&self.scratch).context(DecodeTextSnafu)?
            }
            0x20 => {
                let second = self.read_byte()?;
                let id = (u32::from(octet & 0x0F) << 4) | u32::from(second >> 4);
                let length =
                    integer::read_len_bit5(&mut self.reader, second).context(DecodeIntegerSnafu)?;
                self.read_scratch(length as usize)?;
                self.decode_alphabet_scratch(id + 1)?
            }
            _ => {
                let second = self.read_byte()?;
                let id = (u32::from(octet & 0x0F) << 4) | u32::from(second >> 4);
                let length =
                    integer::read_len_bit5(&mut self.reader, second).context(DecodeIntegerSnafu)?;
                self.read_scratch(length as usize)?;
                self.decode_algorithm_scratch(id + 1)?.0
            }
        };
        if add && self.value_table_mut(table).insert(&value).is_none() {
            tracing::warn!("{} table is full, coding literally", table.label());
        }
        Ok(value)
    }

    fn read_scratch(&mut self, length: usize) -> Result<()> {
        self.scratch.clear();
        self.reader
            .read_into(length, &mut self.scratch)
            .context(ReadBytesSnafu)
    }

    fn decode_alphabet_scratch(&mut self, index: u32) -> Result<String> {
        let local = index
            .checked_sub(EXTENDED_ALPHABET_START)
            .and_then(|i| self.local_alphabets.get(i as usize));
        let mut out = String::new();
        match local {
            Some(alphabet) => alphabet
                .decode(&self.scratch, &mut out)
                .context(DecodeAlphabetSnafu)?,
            None => self
                .alphabets
                .get(index)
                .context(DecodeAlphabetSnafu)?
                .decode(&self.scratch, &mut out)
                .context(DecodeAlphabetSnafu)?,
        }
        Ok(out)
    }

    /// Decode algorithm content from the scratch buffer. The second
    /// component tells whether the CDATA algorithm carried the content.
    fn decode_algorithm_scratch(&mut self, index: u32) -> Result<(String, bool)> {
        let mut out = String::new();
        let local_uri = index
            .checked_sub(algorithm::EXTENDED_ALGORITHM_START)
            .and_then(|i| self.local_algorithm_uris.get(i as usize));
        let resolved = match local_uri {
            Some(uri) => {
                let index = self.algorithms.index_of_uri(uri).context(DecodeAlgorithmSnafu)?;
                self.algorithms.get(index).context(DecodeAlgorithmSnafu)?
            }
            None => self.algorithms.get(index).context(DecodeAlgorithmSnafu)?,
        };
        resolved
            .string_from_octets(&self.scratch, &mut out)
            .context(DecodeAlgorithmSnafu)?;
        Ok((out, index == algorithm::indices::CDATA))
    }

    /// Decode a character chunk; the non-identifying string form starts
    /// on the third bit of `octet`.
    fn decode_character_chunk(&mut self, octet: u8) -> Result<NodeEvent> {
        let depth = self.depth();
        let mut node_type = NodeType::Text;
        let value = if octet & 0x20 != 0 {
            let index =
                integer::read_nonzero_bit4(&mut self.reader, octet).context(DecodeIntegerSnafu)?;
            self.vocabulary
                .character_chunks
                .resolve(index)
                .map(str::to_owned)
                .context(VocabularyIndexOutOfBoundsSnafu {
                    index,
                    table: "content character chunk",
                })?
        } else {
            let add = octet & 0x10 != 0;
            let value = match octet & 0x0C {
                0x00 => {
                    let length = integer::read_len_bit7(&mut self.reader, octet)
                        .context(DecodeIntegerSnafu)?;
                    self.read_scratch(length as usize)?;
                    text::decode_utf8(&self.scratch).context(DecodeTextSnafu)?
                }
                0x04 => {
                    let length = integer::read_len_bit7(&mut self.reader, octet)
                        .context(DecodeIntegerSnafu)?;
                    self.read_scratch(length as usize)?;
                    text::decode_utf16be(&self.scratch).context(DecodeTextSnafu)?
                }
                0x08 => {
                    let second = self.read_byte()?;
                    let id = (u32::from(octet & 0x03) << 6) | u32::from(second >> 2);
                    let length = integer::read_len_bit7(&mut self.reader, second)
                        .context(DecodeIntegerSnafu)?;
                    self.read_scratch(length as usize)?;
                    self.decode_alphabet_scratch(id + 1)?
                }
                _ => {
                    let second = self.read_byte()?;
                    let id = (u32::from(octet & 0x03) << 6) | u32::from(second >> 2);
                    let length = integer::read_len_bit7(&mut self.reader, second)
                        .context(DecodeIntegerSnafu)?;
                    self.read_scratch(length as usize)?;
                    let (value, is_cdata) = self.decode_algorithm_scratch(id + 1)?;
                    if is_cdata {
                        node_type = NodeType::Cdata;
                    }
                    value
                }
            };
            if add && self.vocabulary.character_chunks.insert(&value).is_none() {
                tracing::warn!("content character chunk table is full, coding literally");
            }
            value
        };
        let mut event = NodeEvent::of(node_type, depth);
        event.value = value;
        Ok(event)
    }

    fn decode_processing_instruction(&mut self) -> Result<NodeEvent> {
        let target = self.read_identifying(IdTable::OtherNcName)?;
        let content = self.read_non_identifying_bit1(ValueTable::OtherString)?;
        let mut event = NodeEvent::of(NodeType::ProcessingInstruction, self.depth());
        event.name = QualifiedName::unqualified(target);
        event.value = content;
        Ok(event)
    }

    fn decode_comment(&mut self) -> Result<NodeEvent> {
        let content = self.read_non_identifying_bit1(ValueTable::OtherString)?;
        let mut event = NodeEvent::of(NodeType::Comment, self.depth());
        event.value = content;
        Ok(event)
    }

    fn decode_document_type(&mut self, octet: u8) -> Result<NodeEvent> {
        let mut event = NodeEvent::of(NodeType::DocumentType, self.depth());
        if octet & 0x02 != 0 {
            let system_id = self.read_identifying(IdTable::OtherUri)?;
            event
                .attributes
                .push(Attribute::new(QualifiedName::unqualified("system"), system_id));
        }
        if octet & 0x01 != 0 {
            let public_id = self.read_identifying(IdTable::OtherUri)?;
            event
                .attributes
                .push(Attribute::new(QualifiedName::unqualified("public"), public_id));
        }
        // children of the declaration are not supported
        let b = self.read_byte()?;
        if b != TERMINATOR {
            return self.invalid_identifier(b);
        }
        Ok(event)
    }

    fn decode_entity_reference(&mut self, octet: u8) -> Result<NodeEvent> {
        let name = self.read_identifying(IdTable::OtherNcName)?;
        let mut event = NodeEvent::of(NodeType::EntityReference, self.depth());
        event.name = QualifiedName::unqualified(name);
        if octet & 0x02 != 0 {
            let system_id = self.read_identifying(IdTable::OtherUri)?;
            event
                .attributes
                .push(Attribute::new(QualifiedName::unqualified("system"), system_id));
        }
        if octet & 0x01 != 0 {
            let public_id = self.read_identifying(IdTable::OtherUri)?;
            event
                .attributes
                .push(Attribute::new(QualifiedName::unqualified("public"), public_id));
        }
        Ok(event)
    }

    // ---- document framing ----

    fn decode_document_start(&mut self) -> Result<()> {
        let first = self.read_byte()?;
        if first == b'<' {
            self.decode_declaration()?;
        } else {
            self.reader.rewind(1).context(ReadBytesSnafu)?;
        }

        let mut magic = [0u8; 4];
        for slot in magic.iter_mut() {
            *slot = self.read_byte()?;
        }
        snafu::ensure!(magic == MAGIC, InvalidMagicSnafu);

        let flags = self.read_byte()?;
        snafu::ensure!(
            flags & 0x80 == 0,
            MalformedHeaderSnafu {
                message: format!("padding bit set in options octet {:#04x}", flags),
            }
        );

        if flags & document_flags::ADDITIONAL_DATA != 0 {
            let count = integer::read_sequence_len(&mut self.reader).context(DecodeIntegerSnafu)?;
            tracing::warn!("skipping {} additional data items", count);
            for _ in 0..count {
                let _id = self.read_nonempty_string_bit2()?;
                let _data = self.read_nonempty_string_bit2()?;
            }
        }
        if flags & document_flags::INITIAL_VOCABULARY != 0 {
            self.decode_initial_vocabulary()?;
        }
        if flags & document_flags::NOTATIONS != 0 {
            self.decode_notations()?;
        }
        if flags & document_flags::UNPARSED_ENTITIES != 0 {
            self.decode_unparsed_entities()?;
        }
        if flags & document_flags::CHARACTER_ENCODING_SCHEME != 0 {
            self.character_encoding_scheme = Some(self.read_nonempty_string_bit2()?);
        }
        if flags & document_flags::STANDALONE != 0 {
            let b = self.read_byte()?;
            self.standalone = match b {
                0 => Some(false),
                1 => Some(true),
                _ => {
                    return MalformedHeaderSnafu {
                        message: format!("invalid standalone octet {:#04x}", b),
                    }
                    .fail()
                }
            };
        }
        if flags & document_flags::VERSION != 0 {
            self.version = Some(self.read_non_identifying_bit1(ValueTable::OtherString)?);
        }
        Ok(())
    }

    fn decode_declaration(&mut self) -> Result<()> {
        let mut raw = vec![b'<'];
        loop {
            let b = self.read_byte()?;
            raw.push(b);
            if b == b'>' {
                break;
            }
            snafu::ensure!(raw.len() <= 128, InvalidDeclarationSnafu);
        }
        let declaration = std::str::from_utf8(&raw)
            .ok()
            .filter(|d| DECLARATIONS.contains(d))
            .context(InvalidDeclarationSnafu)?;
        let position = DECLARATIONS
            .iter()
            .position(|d| d == &declaration)
            .unwrap_or_default();
        self.version = match position / 3 {
            1 => Some("1.0".to_owned()),
            2 => Some("1.1".to_owned()),
            _ => None,
        };
        self.standalone = match position % 3 {
            1 => Some(true),
            2 => Some(false),
            _ => None,
        };
        self.declaration = Some(declaration.to_owned());
        Ok(())
    }

    fn read_nonempty_string_bit2(&mut self) -> Result<String> {
        let octet = self.read_byte()?;
        if octet & 0x80 != 0 {
            return self.invalid_identifier(octet);
        }
        let length = integer::read_len_bit2(&mut self.reader, octet).context(DecodeIntegerSnafu)?;
        self.read_scratch(length as usize)?;
        text::decode_utf8(&self.scratch).context(DecodeTextSnafu)
    }

    fn decode_initial_vocabulary(&mut self) -> Result<()> {
        let b1 = self.read_byte()?;
        let b2 = self.read_byte()?;

        if b1 & vocabulary_flags::EXTERNAL_VOCABULARY != 0 {
            let uri = self.read_nonempty_string_bit2()?;
            let external = self
                .external
                .get(&uri)
                .context(UnresolvedExternalVocabularySnafu { uri: uri.clone() })?;
            self.vocabulary = external.instantiate();
        }
        if b1 & vocabulary_flags::RESTRICTED_ALPHABETS != 0 {
            let count = integer::read_sequence_len(&mut self.reader).context(DecodeIntegerSnafu)?;
            for _ in 0..count {
                let characters = self.read_nonempty_string_bit2()?;
                let alphabet =
                    RestrictedAlphabet::new(&characters).context(DecodeAlphabetSnafu)?;
                self.local_alphabets.push(alphabet);
            }
        }
        if b1 & vocabulary_flags::ENCODING_ALGORITHMS != 0 {
            let count = integer::read_sequence_len(&mut self.reader).context(DecodeIntegerSnafu)?;
            for _ in 0..count {
                let uri = self.read_nonempty_string_bit2()?;
                self.local_algorithm_uris.push(uri);
            }
        }
        if b1 & vocabulary_flags::PREFIXES != 0 {
            self.decode_string_table(IdTable::Prefix)?;
        }
        if b1 & vocabulary_flags::NAMESPACE_NAMES != 0 {
            self.decode_string_table(IdTable::NamespaceName)?;
        }
        if b2 & vocabulary_flags::LOCAL_NAMES != 0 {
            self.decode_string_table(IdTable::LocalName)?;
        }
        if b2 & vocabulary_flags::OTHER_NCNAMES != 0 {
            self.decode_string_table(IdTable::OtherNcName)?;
        }
        if b2 & vocabulary_flags::OTHER_URIS != 0 {
            self.decode_string_table(IdTable::OtherUri)?;
        }
        if b2 & vocabulary_flags::ATTRIBUTE_VALUES != 0 {
            self.decode_value_table(ValueTable::AttributeValue)?;
        }
        if b2 & vocabulary_flags::CONTENT_CHARACTER_CHUNKS != 0 {
            let count = integer::read_sequence_len(&mut self.reader).context(DecodeIntegerSnafu)?;
            for _ in 0..count {
                let value = self.read_nonempty_string_bit2()?;
                self.vocabulary.character_chunks.insert(&value);
            }
        }
        if b2 & vocabulary_flags::OTHER_STRINGS != 0 {
            self.decode_value_table(ValueTable::OtherString)?;
        }
        if b2 & vocabulary_flags::ELEMENT_NAME_SURROGATES != 0 {
            self.decode_name_surrogates(true)?;
        }
        if b2 & vocabulary_flags::ATTRIBUTE_NAME_SURROGATES != 0 {
            self.decode_name_surrogates(false)?;
        }
        Ok(())
    }

    fn decode_string_table(&mut self, table: IdTable) -> Result<()> {
        let count = integer::read_sequence_len(&mut self.reader).context(DecodeIntegerSnafu)?;
        for _ in 0..count {
            let value = self.read_nonempty_string_bit2()?;
            self.id_table_mut(table).insert(&value);
        }
        Ok(())
    }

    fn decode_value_table(&mut self, table: ValueTable) -> Result<()> {
        let count = integer::read_sequence_len(&mut self.reader).context(DecodeIntegerSnafu)?;
        for _ in 0..count {
            let value = self.read_nonempty_string_bit2()?;
            self.value_table_mut(table).insert(&value);
        }
        Ok(())
    }

    fn decode_name_surrogates(&mut self, element: bool) -> Result<()> {
        let count = integer::read_sequence_len(&mut self.reader).context(DecodeIntegerSnafu)?;
        for _ in 0..count {
            let flags = self.read_byte()?;
            if flags & 0x02 != 0 && flags & 0x01 == 0 {
                return InvalidQualifiedNameSnafu {
                    position: self.reader.position(),
                }
                .fail();
            }
            let prefix = if flags & 0x02 != 0 {
                Some(self.read_surrogate_index(IdTable::Prefix)?)
            } else {
                None
            };
            let namespace = if flags & 0x01 != 0 {
                Some(self.read_surrogate_index(IdTable::NamespaceName)?)
            } else {
                None
            };
            let local = self.read_surrogate_index(IdTable::LocalName)?;
            let name = QualifiedName::new(
                prefix.unwrap_or_default(),
                namespace.unwrap_or_default(),
                local,
            );
            let table = if element {
                &mut self.vocabulary.element_names
            } else {
                &mut self.vocabulary.attribute_names
            };
            table.insert(&name);
        }
        Ok(())
    }

    fn read_surrogate_index(&mut self, table: IdTable) -> Result<String> {
        let octet = self.read_byte()?;
        let index =
            integer::read_nonzero_bit2(&mut self.reader, octet).context(DecodeIntegerSnafu)?;
        self.id_table(table)
            .resolve(index)
            .map(str::to_owned)
            .context(VocabularyIndexOutOfBoundsSnafu {
                index,
                table: table.label(),
            })
    }

    fn decode_notations(&mut self) -> Result<()> {
        loop {
            let b = self.read_byte()?;
            if b & 0xFC == 0xC0 {
                let name = self.read_identifying(IdTable::OtherNcName)?;
                let system_id = if b & 0x02 != 0 {
                    self.read_identifying(IdTable::OtherUri)?
                } else {
                    String::new()
                };
                let public_id = if b & 0x01 != 0 {
                    self.read_identifying(IdTable::OtherUri)?
                } else {
                    String::new()
                };
                self.notations.push(Notation {
                    name,
                    system_id,
                    public_id,
                });
            } else if b == TERMINATOR {
                return Ok(());
            } else {
                return self.invalid_identifier(b);
            }
        }
    }

    fn decode_unparsed_entities(&mut self) -> Result<()> {
        loop {
            let b = self.read_byte()?;
            if b & 0xFE == 0xD0 {
                let name = self.read_identifying(IdTable::OtherNcName)?;
                let system_id = self.read_identifying(IdTable::OtherUri)?;
                let public_id = if b & 0x01 != 0 {
                    self.read_identifying(IdTable::OtherUri)?
                } else {
                    String::new()
                };
                let notation_name = self.read_identifying(IdTable::OtherNcName)?;
                self.unparsed_entities.push(UnparsedEntity {
                    name,
                    system_id,
                    public_id,
                    notation_name,
                });
            } else if b == TERMINATOR {
                return Ok(());
            } else {
                return self.invalid_identifier(b);
            }
        }
    }
}

impl Error {
    /// The taxonomy kind of this error, used by the document reader to
    /// report a poisoned stream.
    pub fn kind(&self) -> crate::document::ErrorKind {
        use crate::document::ErrorKind;
        match self {
            Error::MalformedHeader { .. } => ErrorKind::MalformedHeader,
            Error::InvalidMagic { .. } => ErrorKind::InvalidMagic,
            Error::InvalidDeclaration { .. } => ErrorKind::InvalidDeclaration,
            Error::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            Error::InvalidQualifiedName { .. } => ErrorKind::InvalidQualifiedName,
            Error::VocabularyIndexOutOfBounds { .. } => ErrorKind::VocabularyIndexOutOfBounds,
            Error::UnresolvedExternalVocabulary { .. } => ErrorKind::MalformedHeader,
            Error::ReadBytes { source, .. } => match source {
                fastinfoset_encoding::buffer::Error::UnexpectedEndOfStream { .. } => {
                    ErrorKind::UnexpectedEof
                }
                _ => ErrorKind::Io,
            },
            Error::DecodeInteger { source, .. } => integer_kind(source),
            Error::DecodeText { .. } => ErrorKind::InvalidCharacterString,
            Error::DecodeAlphabet { source, .. } => alphabet_kind(source),
            Error::DecodeAlgorithm { source, .. } => algorithm_kind(source),
        }
    }
}

fn integer_kind(error: &integer::Error) -> crate::document::ErrorKind {
    use crate::document::ErrorKind;
    match error {
        integer::Error::InvalidIntegerEncoding { .. } | integer::Error::IntegerOutOfRange { .. } => {
            ErrorKind::InvalidIntegerEncoding
        }
        integer::Error::InvalidLengthEncoding { .. } | integer::Error::LengthOutOfRange { .. } => {
            ErrorKind::InvalidLengthEncoding
        }
        integer::Error::ReadBytes { source } => match source {
            fastinfoset_encoding::buffer::Error::UnexpectedEndOfStream { .. } => {
                ErrorKind::UnexpectedEof
            }
            _ => ErrorKind::Io,
        },
        _ => ErrorKind::InvalidIntegerEncoding,
    }
}

fn alphabet_kind(error: &fastinfoset_encoding::alphabet::Error) -> crate::document::ErrorKind {
    use crate::document::ErrorKind;
    use fastinfoset_encoding::alphabet::Error as A;
    match error {
        A::CharacterNotInAlphabet { .. } => ErrorKind::CharacterNotInAlphabet,
        A::UnknownRestrictedAlphabet { .. } => ErrorKind::UnknownRestrictedAlphabet,
        _ => ErrorKind::InvalidRestrictedAlphabet,
    }
}

fn algorithm_kind(error: &algorithm::Error) -> crate::document::ErrorKind {
    use crate::document::ErrorKind;
    match error {
        algorithm::Error::UnknownEncodingAlgorithm { .. }
        | algorithm::Error::UnknownAlgorithmUri { .. } => ErrorKind::UnknownEncodingAlgorithm,
        _ => ErrorKind::InvalidAlgorithmData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<NodeEvent> {
        let mut decoder = StatefulDecoder::new(bytes);
        let mut events = Vec::new();
        while let Some(event) = decoder.read_event().unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn minimal_document() {
        // <a/>
        let bytes = [
            0xE0, 0x00, 0x00, 0x01, 0x00, // header
            0x3C, 0x00, b'a', // element, literal local name "a"
            0xF0, // element close
            0xF0, // end of document
        ];
        let events = decode_all(&bytes);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].node_type, NodeType::Element);
        assert_eq!(events[0].name, QualifiedName::unqualified("a"));
        assert_eq!(events[0].depth, 0);
        assert_eq!(events[1].node_type, NodeType::EndElement);
        assert_eq!(events[1].name, QualifiedName::unqualified("a"));
        assert_eq!(events[2].node_type, NodeType::EndDocument);
    }

    #[test]
    fn repeated_names_resolve_through_the_tables() {
        // <x a="v"/><x a="v"/>
        let bytes = [
            0xE0, 0x00, 0x00, 0x01, 0x00, // header
            0x7C, 0x00, b'x', // element with attributes, literal "x"
            0x78, 0x00, b'a', // attribute, literal "a"
            0x40, b'v', // literal value "v", added to the table
            0xFF, // end attributes + element close
            0x40, // element with attributes, name index 1
            0x00, // attribute name index 1
            0x80, // value index 1
            0xFF, // end attributes + element close
            0xF0, // end of document
        ];
        let events = decode_all(&bytes);
        assert_eq!(events.len(), 5);
        for element in [&events[0], &events[2]] {
            assert_eq!(element.node_type, NodeType::Element);
            assert_eq!(element.name, QualifiedName::unqualified("x"));
            assert_eq!(element.attributes.len(), 1);
            assert_eq!(element.attributes[0].name, QualifiedName::unqualified("a"));
            assert_eq!(element.attributes[0].value, "v");
        }
        assert_eq!(events[4].node_type, NodeType::EndDocument);
    }

    #[test]
    fn double_terminator_closes_two_levels() {
        // <a><b/></a>
        let bytes = [
            0xE0, 0x00, 0x00, 0x01, 0x00, // header
            0x3C, 0x00, b'a', // <a>
            0x3C, 0x00, b'b', // <b>
            0xFF, // close b and a
            0xF0, // end of document
        ];
        let events = decode_all(&bytes);
        let kinds: Vec<NodeType> = events.iter().map(|e| e.node_type).collect();
        assert_eq!(
            kinds,
            vec![
                NodeType::Element,
                NodeType::Element,
                NodeType::EndElement,
                NodeType::EndElement,
                NodeType::EndDocument,
            ]
        );
        assert_eq!(events[1].depth, 1);
        assert_eq!(events[2].name, QualifiedName::unqualified("b"));
        assert_eq!(events[3].name, QualifiedName::unqualified("a"));
    }

    #[test]
    fn namespace_attributes_surface_as_xmlns_attributes() {
        // <p:r xmlns:p="u"/>
        let bytes = [
            0xE0, 0x00, 0x00, 0x01, 0x00, // header
            0x38, // element, namespace attributes follow
            0xCF, // namespace attribute with prefix and namespace
            0x00, b'p', // prefix "p"
            0x00, b'u', // namespace name "u"
            0xF0, // end of namespace attributes
            0x3F, // literal qualified name with prefix and namespace
            0x81, // prefix index 2 ("p"; index 1 is "xml")
            0x81, // namespace index 2 ("u")
            0x00, b'r', // local name "r"
            0xF0, // element close
            0xF0, // end of document
        ];
        let events = decode_all(&bytes);
        assert_eq!(events[0].node_type, NodeType::Element);
        assert_eq!(events[0].name, QualifiedName::new("p", "u", "r"));
        assert_eq!(events[0].attributes.len(), 1);
        let declaration = &events[0].attributes[0];
        assert_eq!(declaration.name.prefix, "xmlns");
        assert_eq!(declaration.name.local_name, "p");
        assert_eq!(declaration.value, "u");
    }

    #[test]
    fn empty_attribute_value_is_a_single_octet() {
        // <x a=""/>
        let bytes = [
            0xE0, 0x00, 0x00, 0x01, 0x00, // header
            0x7C, 0x00, b'x', // element with attributes
            0x78, 0x00, b'a', // attribute "a"
            0xFF, // the empty string spelled as a zero index
            0xFF, // end attributes + element close
            0xF0, // end of document
        ];
        let events = decode_all(&bytes);
        assert_eq!(events[0].attributes[0].value, "");
    }

    #[test]
    fn comment_and_processing_instruction() {
        let bytes = [
            0xE0, 0x00, 0x00, 0x01, 0x00, // header
            0xE2, 0x41, b'h', b'i', // comment "hi", added to the table
            0xE1, 0x01, b'g', b'o', // PI target "go"
            0x41, b'o', b'n', // PI content "on"
            0x3C, 0x00, b'a', // <a>
            0xF0, // element close
            0xF0, // end of document
        ];
        let events = decode_all(&bytes);
        assert_eq!(events[0].node_type, NodeType::Comment);
        assert_eq!(events[0].value, "hi");
        assert_eq!(events[1].node_type, NodeType::ProcessingInstruction);
        assert_eq!(events[1].name.local_name, "go");
        assert_eq!(events[1].value, "on");
        assert_eq!(events[2].node_type, NodeType::Element);
    }

    #[test]
    fn character_chunks_use_the_chunk_table() {
        // <a>hi</a><a>hi</a> is not well formed; use nested elements instead
        let bytes = [
            0xE0, 0x00, 0x00, 0x01, 0x00, // header
            0x3C, 0x00, b'a', // <a>
            0x3C, 0x00, b'b', // <b>
            0x91, b'h', b'i', // literal chunk "hi", add to table
            0xF0, // close b
            0x3C, 0x00, b'c', // <c>
            0xA0, // chunk index 1
            0xFF, // close c and a
            0xF0, // end of document
        ];
        let events = decode_all(&bytes);
        let texts: Vec<&NodeEvent> = events
            .iter()
            .filter(|e| e.node_type == NodeType::Text)
            .collect();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].value, "hi");
        assert_eq!(texts[1].value, "hi");
        assert_eq!(texts[0].depth, 2);
    }

    #[test]
    fn declaration_prefix_is_accepted() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"<?xml version='1.0' encoding='finf' standalone='no'?>");
        bytes.extend_from_slice(&[0xE0, 0x00, 0x00, 0x01, 0x00, 0x3C, 0x00, b'a', 0xF0, 0xF0]);
        let mut decoder = StatefulDecoder::new(&bytes[..]);
        let first = decoder.read_event().unwrap().unwrap();
        assert_eq!(first.node_type, NodeType::Element);
        assert_eq!(decoder.version(), Some("1.0"));
        assert_eq!(decoder.standalone(), Some(false));
    }

    #[test]
    fn garbage_magic_is_fatal() {
        let bytes = [0xE0, 0x00, 0x00, 0x02, 0x00];
        let mut decoder = StatefulDecoder::new(&bytes[..]);
        assert!(matches!(
            decoder.read_event(),
            Err(Error::InvalidMagic { .. })
        ));
    }

    #[test]
    fn unknown_identifier_is_fatal() {
        let bytes = [0xE0, 0x00, 0x00, 0x01, 0x00, 0xE5];
        let mut decoder = StatefulDecoder::new(&bytes[..]);
        assert!(matches!(
            decoder.read_event(),
            Err(Error::InvalidIdentifier { octet: 0xE5, .. })
        ));
    }

    #[test]
    fn index_out_of_bounds_is_fatal() {
        // element name index 5 with an empty table
        let bytes = [0xE0, 0x00, 0x00, 0x01, 0x00, 0x04];
        let mut decoder = StatefulDecoder::new(&bytes[..]);
        assert!(matches!(
            decoder.read_event(),
            Err(Error::VocabularyIndexOutOfBounds { index: 5, .. })
        ));
    }
}
