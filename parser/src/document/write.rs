//! The document-level writer: the operation surface which XML streaming
//! writer adapters drive.
//!
//! Operation sequencing is enforced by a state table over the writer
//! states and item kinds; an impermissible call fails with `InvalidState`
//! and poisons the writer, after which only `close` is legal. The element
//! being written is buffered until its attribute list completes, then
//! flushed through the stateful encoder.

use crate::document::{ErrorKind, WriterOptions};
use crate::namespace::{self, NamespaceDecl, NamespaceManager};
use crate::stateful::encode::{self, StatefulEncoder};
use fastinfoset_core::event::Attribute;
use fastinfoset_core::name::{QualifiedName, XMLNS_NAMESPACE_URI, XMLNS_PREFIX};
use fastinfoset_core::vocabulary::Vocabulary;
use fastinfoset_encoding::algorithm::indices;
use snafu::{Backtrace, Snafu};
use std::io::Write;

/// Module-level error type:
/// for sequencing violations and failures of the layers below.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Item {:?} is not permitted in writer state {:?}", item, state))]
    InvalidState {
        item: XmlItem,
        state: WriteState,
        backtrace: Backtrace,
    },

    #[snafu(display("{} is not supported", feature))]
    UnsupportedFeature {
        feature: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("The writer previously failed with {}", kind))]
    Poisoned { kind: ErrorKind },

    #[snafu(transparent)]
    Namespace {
        #[snafu(backtrace)]
        source: namespace::Error,
    },

    #[snafu(transparent)]
    Encode {
        #[snafu(backtrace)]
        source: encode::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidState { .. } => ErrorKind::InvalidState,
            Error::UnsupportedFeature { .. } => ErrorKind::UnsupportedFeature,
            Error::Poisoned { kind } => *kind,
            Error::Namespace { source, .. } => match source {
                namespace::Error::UndefinedNamespaceForPrefix { .. } => {
                    ErrorKind::UndefinedNamespaceForPrefix
                }
                _ => ErrorKind::ReservedNamespace,
            },
            Error::Encode { source, .. } => source.kind(),
        }
    }
}

/// The sequencing state of a document writer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriteState {
    /// Nothing has been written.
    Start,
    /// The document has started; no element is open.
    Prolog,
    /// An element has started and its attribute list is open.
    Element,
    /// An attribute has started.
    Attribute,
    /// Character data has been written into the open attribute.
    AttributeContent,
    /// Inside element content.
    Content,
    /// The root element has closed.
    Epilog,
    /// The document has ended or the writer was closed.
    Closed,
    /// A previous operation failed; only `close` is legal.
    Error,
}

/// The kind of item a writer operation produces, as checked against the
/// state table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum XmlItem {
    /// Character data.
    Content,
    /// A comment.
    Comment,
    /// A document type declaration.
    DocType,
    /// The end of the open attribute.
    EndAttribute,
    /// The end of the document.
    EndDocument,
    /// The end of the open element.
    EndElement,
    /// An entity reference.
    EntityRef,
    /// A processing instruction.
    ProcessingInstruction,
    /// Raw markup.
    Raw,
    /// The start of an attribute.
    StartAttribute,
    /// The start of the document.
    StartDocument,
    /// The start of an element.
    StartElement,
    /// A surrogate pair written as a character entity.
    SurrogateCharEntity,
    /// Ignorable whitespace.
    Whitespace,
    /// Algorithm-encoded content.
    EncodedContent,
}

/// Whether the state table permits the given item in the given state.
///
/// `Start` rows account for the convenience transition which implicitly
/// starts the document.
fn permitted(item: XmlItem, state: WriteState) -> bool {
    use WriteState as S;
    use XmlItem::*;
    match item {
        StartDocument => matches!(state, S::Start),
        DocType => matches!(state, S::Start | S::Prolog),
        StartElement => matches!(state, S::Start | S::Prolog | S::Element | S::Content),
        StartAttribute => matches!(state, S::Element | S::Attribute | S::AttributeContent),
        EndAttribute => matches!(state, S::Attribute | S::AttributeContent),
        Content => matches!(
            state,
            S::Start | S::Prolog | S::Element | S::Attribute | S::AttributeContent | S::Content | S::Epilog
        ),
        Whitespace => matches!(state, S::Start | S::Prolog | S::Element | S::Content | S::Epilog),
        Comment | ProcessingInstruction => {
            matches!(state, S::Start | S::Prolog | S::Element | S::Content | S::Epilog)
        }
        EncodedContent => matches!(state, S::Element | S::Content),
        EndElement => matches!(state, S::Element | S::Attribute | S::AttributeContent | S::Content),
        EndDocument => matches!(
            state,
            S::Prolog | S::Element | S::Attribute | S::AttributeContent | S::Content | S::Epilog
        ),
        EntityRef | Raw | SurrogateCharEntity => matches!(
            state,
            S::Start | S::Prolog | S::Element | S::Attribute | S::AttributeContent | S::Content | S::Epilog
        ),
    }
}

#[derive(Debug)]
struct PendingElement {
    name: QualifiedName,
    namespaces: Vec<NamespaceDecl>,
    attributes: Vec<Attribute>,
}

/// A streaming writer of one Fast Infoset document.
#[derive(Debug)]
pub struct DocumentWriter<W: Write> {
    encoder: StatefulEncoder<W>,
    declaration: Option<&'static str>,
    external_vocabulary_uri: Option<String>,
    state: WriteState,
    namespaces: NamespaceManager,
    pending_element: Option<PendingElement>,
    current_attribute: Option<(QualifiedName, String)>,
    open_elements: u32,
    fail: Option<ErrorKind>,
}

impl<W> DocumentWriter<W>
where
    W: Write,
{
    /// Create a writer over the given sink with default options.
    pub fn new(sink: W) -> Self {
        DocumentWriter::new_with_options(sink, WriterOptions::default())
    }

    /// Create a writer over the given sink.
    pub fn new_with_options(sink: W, options: WriterOptions) -> Self {
        let declaration = options.declaration.map(|d| d.text());
        let external_vocabulary_uri = options
            .external_vocabulary
            .as_ref()
            .map(|v| v.uri().to_owned());
        DocumentWriter {
            encoder: StatefulEncoder::new_with_options(sink, &options),
            declaration,
            external_vocabulary_uri,
            state: WriteState::Start,
            namespaces: NamespaceManager::new(),
            pending_element: None,
            current_attribute: None,
            open_elements: 0,
            fail: None,
        }
    }

    /// The writer's sequencing state.
    pub fn write_state(&self) -> WriteState {
        self.state
    }

    /// The number of open elements.
    pub fn depth(&self) -> u32 {
        self.open_elements
    }

    /// The writer's vocabulary, as grown so far.
    pub fn vocabulary(&self) -> &Vocabulary {
        self.encoder.vocabulary()
    }

    /// Start the document, emitting the header and the declaration
    /// configured in the options.
    pub fn write_start_document(&mut self) -> Result<()> {
        let result = self.start_document_inner();
        self.fuse(result)
    }

    /// Start an element. `None` namespace components are resolved against
    /// the bindings in scope.
    pub fn write_start_element(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<()> {
        let result = self.start_element_inner(prefix, local_name, namespace_uri);
        self.fuse(result)
    }

    /// Start an attribute on the open element. A previously open
    /// attribute is ended implicitly.
    pub fn write_start_attribute(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<()> {
        let result = self.start_attribute_inner(prefix, local_name, namespace_uri);
        self.fuse(result)
    }

    /// End the open attribute.
    pub fn write_end_attribute(&mut self) -> Result<()> {
        let result = self.end_attribute_checked();
        self.fuse(result)
    }

    /// Write character data: attribute value content inside an attribute,
    /// a character chunk inside an element.
    pub fn write_string(&mut self, content: &str) -> Result<()> {
        let result = self.string_inner(content);
        self.fuse(result)
    }

    /// Write ignorable whitespace. Outside element content it is
    /// discarded, since the format cannot carry document-level text.
    pub fn write_whitespace(&mut self, content: &str) -> Result<()> {
        let result = self.whitespace_inner(content);
        self.fuse(result)
    }

    /// Write a character chunk without the document-level conveniences.
    pub fn write_character_chunk(&mut self, content: &str) -> Result<()> {
        let result = self.chunk_inner(XmlItem::Content, content);
        self.fuse(result)
    }

    /// Write a CDATA section, carried through the CDATA encoding
    /// algorithm.
    pub fn write_cdata(&mut self, content: &str) -> Result<()> {
        let result = self.encoded_inner(indices::CDATA, content.as_bytes());
        self.fuse(result)
    }

    /// Write binary content through the base64 encoding algorithm.
    pub fn write_base64(&mut self, octets: &[u8]) -> Result<()> {
        let result = self.encoded_inner(indices::BASE64, octets);
        self.fuse(result)
    }

    /// Write algorithm-encoded content under the given table index.
    pub fn write_encoded_data(&mut self, algorithm: u32, octets: &[u8]) -> Result<()> {
        let result = self.encoded_inner(algorithm, octets);
        self.fuse(result)
    }

    /// Write a character chunk packed with the restricted alphabet at the
    /// given table index.
    pub fn write_alphabet_string(&mut self, alphabet: u32, content: &str) -> Result<()> {
        let result = self.alphabet_inner(alphabet, content);
        self.fuse(result)
    }

    /// Write a comment. Before the document starts, the document is
    /// started implicitly.
    pub fn write_comment(&mut self, content: &str) -> Result<()> {
        let result = self.misc_inner(XmlItem::Comment, content, None);
        self.fuse(result)
    }

    /// Write a processing instruction.
    pub fn write_processing_instruction(&mut self, target: &str, content: &str) -> Result<()> {
        let result = self.misc_inner(XmlItem::ProcessingInstruction, content, Some(target));
        self.fuse(result)
    }

    /// Writing a document type declaration is not supported.
    pub fn write_doctype(&mut self, _name: &str) -> Result<()> {
        let result = self.unsupported(XmlItem::DocType, "document type declaration writing");
        self.fuse(result)
    }

    /// Writing an entity reference is not supported.
    pub fn write_entity_ref(&mut self, _name: &str) -> Result<()> {
        let result = self.unsupported(XmlItem::EntityRef, "entity reference writing");
        self.fuse(result)
    }

    /// Writing a surrogate pair as a character entity is not supported.
    pub fn write_surrogate_char_entity(&mut self, _low: char, _high: char) -> Result<()> {
        let result = self.unsupported(XmlItem::SurrogateCharEntity, "surrogate char entities");
        self.fuse(result)
    }

    /// Writing raw markup is not supported.
    pub fn write_raw(&mut self, _markup: &str) -> Result<()> {
        let result = self.unsupported(XmlItem::Raw, "raw markup writing");
        self.fuse(result)
    }

    /// End the open element, ending any open attribute first.
    pub fn write_end_element(&mut self) -> Result<()> {
        let result = self.end_element_checked();
        self.fuse(result)
    }

    /// End the document, closing all open structures.
    pub fn write_end_document(&mut self) -> Result<()> {
        let result = self.end_document_inner();
        self.fuse(result)
    }

    /// Deliver all buffered octets and flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(kind) = self.fail {
            return PoisonedSnafu { kind }.fail();
        }
        self.encoder.flush().map_err(Error::from)
    }

    /// Close the writer. Legal in every state, including after an error.
    pub fn close(&mut self) -> Result<()> {
        if self.state == WriteState::Closed {
            return Ok(());
        }
        let result = if self.fail.is_none() {
            self.encoder.flush().map_err(Error::from)
        } else {
            Ok(())
        };
        self.state = WriteState::Closed;
        result
    }

    // ---- guarded bodies ----

    fn fuse<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            if !matches!(error, Error::Poisoned { .. }) {
                self.fail = Some(error.kind());
                self.state = WriteState::Error;
            }
        }
        result
    }

    fn entry(&mut self, item: XmlItem) -> Result<()> {
        if let Some(kind) = self.fail {
            return PoisonedSnafu { kind }.fail();
        }
        snafu::ensure!(
            permitted(item, self.state),
            InvalidStateSnafu {
                item,
                state: self.state,
            }
        );
        Ok(())
    }

    fn unsupported(&mut self, item: XmlItem, feature: &'static str) -> Result<()> {
        self.entry(item)?;
        UnsupportedFeatureSnafu { feature }.fail()
    }

    fn implicit_start(&mut self) -> Result<()> {
        if self.state == WriteState::Start {
            self.encoder
                .write_header(self.declaration, self.external_vocabulary_uri.as_deref())?;
            self.state = WriteState::Prolog;
        }
        Ok(())
    }

    fn start_document_inner(&mut self) -> Result<()> {
        self.entry(XmlItem::StartDocument)?;
        self.implicit_start()
    }

    fn flush_pending_element(&mut self) -> Result<()> {
        if let Some(pending) = self.pending_element.take() {
            self.encoder.write_element_start(
                &pending.name,
                &pending.namespaces,
                &pending.attributes,
            )?;
        }
        Ok(())
    }

    fn start_element_inner(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<()> {
        self.entry(XmlItem::StartElement)?;
        self.implicit_start()?;
        self.flush_pending_element()?;
        self.namespaces.push_frame();
        let mut declared = Vec::new();
        let name = self
            .namespaces
            .element_name(prefix, local_name, namespace_uri, &mut declared)?;
        self.pending_element = Some(PendingElement {
            name,
            namespaces: declared,
            attributes: Vec::new(),
        });
        self.open_elements += 1;
        self.state = WriteState::Element;
        Ok(())
    }

    fn start_attribute_inner(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Result<()> {
        self.entry(XmlItem::StartAttribute)?;
        if self.current_attribute.is_some() {
            self.end_attribute_inner()?;
        }
        let name = if prefix == Some(XMLNS_PREFIX) {
            QualifiedName::new(XMLNS_PREFIX, XMLNS_NAMESPACE_URI, local_name)
        } else if prefix.unwrap_or("").is_empty() && local_name == XMLNS_PREFIX {
            QualifiedName::new("", XMLNS_NAMESPACE_URI, XMLNS_PREFIX)
        } else {
            let pending = match &mut self.pending_element {
                Some(pending) => pending,
                // the Element state always has a pending element
                None => {
                    return InvalidStateSnafu {
                        item: XmlItem::StartAttribute,
                        state: self.state,
                    }
                    .fail()
                }
            };
            let mut declared = Vec::new();
            let name =
                self.namespaces
                    .attribute_name(prefix, local_name, namespace_uri, &mut declared)?;
            pending.namespaces.extend(declared);
            name
        };
        self.current_attribute = Some((name, String::new()));
        self.state = WriteState::Attribute;
        Ok(())
    }

    fn end_attribute_checked(&mut self) -> Result<()> {
        self.entry(XmlItem::EndAttribute)?;
        self.end_attribute_inner()
    }

    fn end_attribute_inner(&mut self) -> Result<()> {
        let (name, value) = match self.current_attribute.take() {
            Some(attribute) => attribute,
            None => return Ok(()),
        };
        let pending = match &mut self.pending_element {
            Some(pending) => pending,
            None => {
                return InvalidStateSnafu {
                    item: XmlItem::EndAttribute,
                    state: self.state,
                }
                .fail()
            }
        };
        if name.is_namespace_declaration() {
            let prefix = if name.prefix == XMLNS_PREFIX {
                name.local_name.clone()
            } else {
                String::new()
            };
            self.namespaces.declare(&prefix, &value)?;
            let declaration = NamespaceDecl { prefix, uri: value };
            if !pending.namespaces.contains(&declaration) {
                pending.namespaces.push(declaration);
            }
        } else {
            pending.attributes.push(Attribute::new(name, value));
        }
        self.state = WriteState::Element;
        Ok(())
    }

    fn string_inner(&mut self, content: &str) -> Result<()> {
        self.entry(XmlItem::Content)?;
        match self.state {
            WriteState::Attribute | WriteState::AttributeContent => {
                if let Some((_, value)) = &mut self.current_attribute {
                    value.push_str(content);
                }
                self.state = WriteState::AttributeContent;
                Ok(())
            }
            WriteState::Element | WriteState::Content => {
                self.flush_pending_element()?;
                self.encoder.write_character_chunk(content)?;
                self.state = WriteState::Content;
                Ok(())
            }
            // Start, Prolog, or Epilog
            _ => {
                self.implicit_start()?;
                if content.chars().all(char::is_whitespace) {
                    tracing::warn!("discarding document-level whitespace");
                    Ok(())
                } else {
                    InvalidStateSnafu {
                        item: XmlItem::Content,
                        state: self.state,
                    }
                    .fail()
                }
            }
        }
    }

    fn whitespace_inner(&mut self, content: &str) -> Result<()> {
        self.entry(XmlItem::Whitespace)?;
        match self.state {
            WriteState::Element | WriteState::Content => self.chunk_body(content),
            _ => {
                self.implicit_start()?;
                Ok(())
            }
        }
    }

    fn chunk_inner(&mut self, item: XmlItem, content: &str) -> Result<()> {
        self.entry(item)?;
        match self.state {
            WriteState::Element | WriteState::Content => self.chunk_body(content),
            _ => InvalidStateSnafu {
                item,
                state: self.state,
            }
            .fail(),
        }
    }

    fn chunk_body(&mut self, content: &str) -> Result<()> {
        self.flush_pending_element()?;
        self.encoder.write_character_chunk(content)?;
        self.state = WriteState::Content;
        Ok(())
    }

    fn encoded_inner(&mut self, algorithm: u32, octets: &[u8]) -> Result<()> {
        self.entry(XmlItem::EncodedContent)?;
        self.flush_pending_element()?;
        self.encoder.write_encoded_chunk(algorithm, octets)?;
        self.state = WriteState::Content;
        Ok(())
    }

    fn alphabet_inner(&mut self, alphabet: u32, content: &str) -> Result<()> {
        self.entry(XmlItem::EncodedContent)?;
        self.flush_pending_element()?;
        self.encoder.write_restricted_chunk(alphabet, content)?;
        self.state = WriteState::Content;
        Ok(())
    }

    fn misc_inner(&mut self, item: XmlItem, content: &str, target: Option<&str>) -> Result<()> {
        self.entry(item)?;
        self.implicit_start()?;
        if self.state == WriteState::Element {
            self.flush_pending_element()?;
            self.state = WriteState::Content;
        }
        match target {
            Some(target) => self.encoder.write_processing_instruction(target, content)?,
            None => self.encoder.write_comment(content)?,
        }
        Ok(())
    }

    fn end_element_checked(&mut self) -> Result<()> {
        self.entry(XmlItem::EndElement)?;
        self.end_element_inner()
    }

    fn end_element_inner(&mut self) -> Result<()> {
        self.end_attribute_inner()?;
        self.flush_pending_element()?;
        self.encoder.write_end_element()?;
        self.namespaces.pop_frame();
        self.open_elements -= 1;
        self.state = if self.open_elements == 0 {
            WriteState::Epilog
        } else {
            WriteState::Content
        };
        Ok(())
    }

    fn end_document_inner(&mut self) -> Result<()> {
        self.entry(XmlItem::EndDocument)?;
        self.end_attribute_inner()?;
        while self.open_elements > 0 {
            self.end_element_inner()?;
        }
        self.encoder.write_end_document()?;
        self.encoder.flush()?;
        self.state = WriteState::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document() {
        let mut sink = Vec::new();
        {
            let mut writer = DocumentWriter::new(&mut sink);
            writer.write_start_document().unwrap();
            writer.write_start_element(None, "a", None).unwrap();
            writer.write_end_element().unwrap();
            writer.write_end_document().unwrap();
        }
        assert_eq!(
            sink,
            vec![0xE0, 0x00, 0x00, 0x01, 0x00, 0x3C, 0x00, b'a', 0xFF]
        );
    }

    #[test]
    fn attributes_are_buffered_until_the_element_flushes() {
        let mut sink = Vec::new();
        {
            let mut writer = DocumentWriter::new(&mut sink);
            writer.write_start_document().unwrap();
            writer.write_start_element(None, "x", None).unwrap();
            writer.write_start_attribute(None, "a", None).unwrap();
            writer.write_string("v").unwrap();
            writer.write_end_attribute().unwrap();
            writer.write_end_element().unwrap();
            writer.write_end_document().unwrap();
        }
        assert_eq!(
            sink,
            vec![
                0xE0, 0x00, 0x00, 0x01, 0x00, // header
                0x7C, 0x00, b'x', // element with attributes
                0x78, 0x00, b'a', // attribute "a"
                0x40, b'v', // value "v"
                0xFF, // end attributes + element close
                0xF0, // end of document
            ]
        );
    }

    #[test]
    fn invalid_sequencing_poisons_the_writer() {
        let mut sink = Vec::new();
        let mut writer = DocumentWriter::new(&mut sink);
        let error = writer.write_end_attribute().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);
        // every further operation reports the same kind
        let error = writer.write_start_document().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);
        assert!(matches!(error, Error::Poisoned { .. }));
        assert!(writer.close().is_ok());
    }

    #[test]
    fn unsupported_features_are_rejected() {
        let mut sink = Vec::new();
        let mut writer = DocumentWriter::new(&mut sink);
        writer.write_start_document().unwrap();
        let error = writer.write_doctype("root").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn comment_before_start_document_starts_it_implicitly() {
        let mut sink = Vec::new();
        {
            let mut writer = DocumentWriter::new(&mut sink);
            writer.write_comment("hello").unwrap();
            writer.write_start_element(None, "a", None).unwrap();
            writer.write_end_document().unwrap();
        }
        assert_eq!(&sink[..5], &[0xE0, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(sink[5], 0xE2);
    }

    #[test]
    fn end_document_closes_open_elements() {
        let mut sink = Vec::new();
        {
            let mut writer = DocumentWriter::new(&mut sink);
            writer.write_start_document().unwrap();
            writer.write_start_element(None, "a", None).unwrap();
            writer.write_start_element(None, "b", None).unwrap();
            writer.write_end_document().unwrap();
        }
        assert_eq!(
            sink,
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
    fn xmlns_attributes_become_namespace_declarations() {
        let mut sink = Vec::new();
        {
            let mut writer = DocumentWriter::new(&mut sink);
            writer.write_start_document().unwrap();
            writer.write_start_element(None, "r", None).unwrap();
            writer.write_start_attribute(Some("xmlns"), "p", None).unwrap();
            writer.write_string("u").unwrap();
            writer.write_end_attribute().unwrap();
            writer.write_end_element().unwrap();
            writer.write_end_document().unwrap();
        }
        // namespace attribute block with xmlns:p="u"
        assert_eq!(sink[5], 0x38);
        assert_eq!(sink[6], 0xCF);
    }

    #[test]
    fn attribute_namespaces_generate_prefixes() {
        let mut sink = Vec::new();
        {
            let mut writer = DocumentWriter::new(&mut sink);
            writer.write_start_document().unwrap();
            writer.write_start_element(None, "r", None).unwrap();
            writer
                .write_start_attribute(None, "id", Some("urn:a"))
                .unwrap();
            writer.write_string("7").unwrap();
            writer.write_end_attribute().unwrap();
            writer.write_end_element().unwrap();
            writer.write_end_document().unwrap();
        }
        let mut decoder = crate::stateful::decode::StatefulDecoder::new(&sink[..]);
        let element = decoder.read_event().unwrap().unwrap();
        assert_eq!(element.attributes.len(), 2);
        assert_eq!(element.attributes[0].name.prefix, "xmlns");
        assert_eq!(element.attributes[0].name.local_name, "d1p1");
        assert_eq!(element.attributes[0].value, "urn:a");
        assert_eq!(element.attributes[1].name.prefix, "d1p1");
        assert_eq!(element.attributes[1].value, "7");
    }

    #[test]
    fn document_level_whitespace_is_discarded() {
        let mut sink = Vec::new();
        {
            let mut writer = DocumentWriter::new(&mut sink);
            writer.write_start_document().unwrap();
            writer.write_string("  \n").unwrap();
            writer.write_start_element(None, "a", None).unwrap();
            writer.write_end_document().unwrap();
        }
        assert_eq!(sink[5], 0x3C);
        // non-whitespace text at document level is an error
        let mut writer = DocumentWriter::new(Vec::new());
        writer.write_start_document().unwrap();
        let error = writer.write_string("text").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);
    }
}
