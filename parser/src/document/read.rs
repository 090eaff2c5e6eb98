//! The document-level reader: a pull cursor over the parsed node events,
//! exposing the read-side primitives which XML streaming reader adapters
//! depend upon.
//!
//! All cursor functions are deterministic over the current event and
//! never consume input; only [`DocumentReader::read`] advances the
//! underlying decoder.

use crate::document::{ErrorKind, ReaderOptions};
use crate::stateful::decode::{self, Notation, StatefulDecoder, UnparsedEntity};
use fastinfoset_core::event::{Attribute, NodeEvent, NodeType};
use snafu::Snafu;
use std::io::Read;

/// Module-level error type:
/// decoding failures plus the poisoned-stream latch.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(transparent)]
    Decode {
        #[snafu(backtrace)]
        source: decode::Error,
    },

    #[snafu(display("The reader previously failed with {}", kind))]
    Poisoned { kind: ErrorKind },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Decode { source, .. } => source.kind(),
            Error::Poisoned { kind } => *kind,
        }
    }
}

/// The lifecycle state of a document reader.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadState {
    /// `read` has not been called yet.
    Initial,
    /// The reader is positioned on an event.
    Interactive,
    /// The document has ended.
    EndOfFile,
    /// A fatal error occurred; every further read reports it.
    Error,
    /// The reader was closed.
    Closed,
}

/// A streaming reader of one Fast Infoset document.
#[derive(Debug)]
pub struct DocumentReader<R> {
    decoder: StatefulDecoder<R>,
    current: NodeEvent,
    cursor: Option<usize>,
    on_attribute_value: bool,
    state: ReadState,
    fail: Option<ErrorKind>,
}

impl<R> DocumentReader<R>
where
    R: Read,
{
    /// Create a reader over the given source with default options.
    pub fn new(source: R) -> Self {
        DocumentReader::new_with_options(source, ReaderOptions::default())
    }

    /// Create a reader over the given source.
    pub fn new_with_options(source: R, options: ReaderOptions) -> Self {
        DocumentReader {
            decoder: StatefulDecoder::new_with_options(source, options),
            current: NodeEvent::of(NodeType::None, 0),
            cursor: None,
            on_attribute_value: false,
            state: ReadState::Initial,
            fail: None,
        }
    }

    /// The reader's lifecycle state.
    pub fn read_state(&self) -> ReadState {
        self.state
    }

    /// Advance to the next node event. Returns `false` at the end of the
    /// document.
    pub fn read(&mut self) -> Result<bool> {
        if let Some(kind) = self.fail {
            return PoisonedSnafu { kind }.fail();
        }
        if matches!(self.state, ReadState::EndOfFile | ReadState::Closed) {
            return Ok(false);
        }
        self.cursor = None;
        self.on_attribute_value = false;
        match self.decoder.read_event() {
            Ok(Some(event)) => {
                self.current = event;
                self.state = ReadState::Interactive;
                Ok(true)
            }
            Ok(None) => {
                self.current = NodeEvent::of(NodeType::None, 0);
                self.state = ReadState::EndOfFile;
                Ok(false)
            }
            Err(error) => {
                self.fail = Some(error.kind());
                self.state = ReadState::Error;
                Err(error.into())
            }
        }
    }

    /// Stop reading. Further reads report the end of the document.
    pub fn close(&mut self) {
        self.state = ReadState::Closed;
        self.current = NodeEvent::of(NodeType::None, 0);
        self.cursor = None;
        self.on_attribute_value = false;
    }

    /// The current event, unaffected by the attribute cursor.
    pub fn event(&self) -> &NodeEvent {
        &self.current
    }

    /// The kind of the current node, accounting for the attribute cursor.
    pub fn node_type(&self) -> NodeType {
        if self.on_attribute_value {
            NodeType::Text
        } else if self.cursor.is_some() {
            NodeType::Attribute
        } else {
            self.current.node_type
        }
    }

    /// The element nesting depth of the current node. Attributes report
    /// one level below their element, attribute values two.
    pub fn depth(&self) -> u32 {
        let mut depth = self.current.depth;
        if self.cursor.is_some() {
            depth += 1;
        }
        if self.on_attribute_value {
            depth += 1;
        }
        depth
    }

    fn cursor_attribute(&self) -> Option<&Attribute> {
        self.cursor.and_then(|index| self.current.attribute(index))
    }

    /// The local name of the current node.
    pub fn local_name(&self) -> &str {
        match self.cursor_attribute() {
            Some(attribute) => &attribute.name.local_name,
            None => &self.current.name.local_name,
        }
    }

    /// The namespace URI of the current node.
    pub fn namespace_uri(&self) -> &str {
        match self.cursor_attribute() {
            Some(attribute) => &attribute.name.namespace_uri,
            None => &self.current.name.namespace_uri,
        }
    }

    /// The namespace prefix of the current node.
    pub fn prefix(&self) -> &str {
        match self.cursor_attribute() {
            Some(attribute) => &attribute.name.prefix,
            None => &self.current.name.prefix,
        }
    }

    /// The character data of the current node, or the value of the
    /// attribute the cursor sits on.
    pub fn value(&self) -> &str {
        match self.cursor_attribute() {
            Some(attribute) => &attribute.value,
            None => &self.current.value,
        }
    }

    /// The number of attributes of the current element.
    pub fn attribute_count(&self) -> usize {
        self.current.attributes.len()
    }

    /// The value of the attribute at the given zero-based position.
    pub fn attribute(&self, index: usize) -> Option<&str> {
        self.current.attribute(index).map(|a| a.value.as_str())
    }

    /// The value of the first attribute with the given local name.
    pub fn attribute_by_name(&self, local_name: &str) -> Option<&str> {
        self.current
            .attribute_by_name(local_name)
            .map(|a| a.value.as_str())
    }

    /// The value of the first attribute with the given namespace URI and
    /// local name.
    pub fn attribute_by_qname(&self, namespace_uri: &str, local_name: &str) -> Option<&str> {
        self.current
            .attribute_by_qname(namespace_uri, local_name)
            .map(|a| a.value.as_str())
    }

    /// Move the cursor to the attribute at the given position.
    pub fn move_to_attribute(&mut self, index: usize) -> bool {
        if index < self.current.attributes.len() {
            self.cursor = Some(index);
            self.on_attribute_value = false;
            true
        } else {
            false
        }
    }

    /// Move the cursor to the first attribute with the given local name.
    pub fn move_to_attribute_by_name(&mut self, local_name: &str) -> bool {
        match self
            .current
            .attributes
            .iter()
            .position(|a| a.name.local_name == local_name)
        {
            Some(index) => self.move_to_attribute(index),
            None => false,
        }
    }

    /// Move the cursor to the first attribute with the given namespace
    /// URI and local name.
    pub fn move_to_attribute_by_qname(
        &mut self,
        namespace_uri: &str,
        local_name: &str,
    ) -> bool {
        match self.current.attributes.iter().position(|a| {
            a.name.namespace_uri == namespace_uri && a.name.local_name == local_name
        }) {
            Some(index) => self.move_to_attribute(index),
            None => false,
        }
    }

    /// Move the cursor to the next attribute, or the first when the
    /// cursor is on the element.
    pub fn move_to_next_attribute(&mut self) -> bool {
        let next = match self.cursor {
            Some(index) => index + 1,
            None => 0,
        };
        self.move_to_attribute(next)
    }

    /// Move the cursor back from an attribute to its element.
    pub fn move_to_element(&mut self) -> bool {
        let was_on_attribute = self.cursor.is_some();
        self.cursor = None;
        self.on_attribute_value = false;
        was_on_attribute
    }

    /// Step the cursor from an attribute onto its value, which is then
    /// reported as a text node.
    pub fn read_attribute_value(&mut self) -> bool {
        if self.cursor.is_some() && !self.on_attribute_value {
            self.on_attribute_value = true;
            true
        } else {
            false
        }
    }

    /// The plaintext XML declaration found before the magic, if any.
    pub fn declaration(&self) -> Option<&str> {
        self.decoder.declaration()
    }

    /// The XML version stated by the document, if any.
    pub fn version(&self) -> Option<&str> {
        self.decoder.version()
    }

    /// The standalone flag stated by the document, if any.
    pub fn standalone(&self) -> Option<bool> {
        self.decoder.standalone()
    }

    /// The notations declared by the document header.
    pub fn notations(&self) -> &[Notation] {
        self.decoder.notations()
    }

    /// The unparsed entities declared by the document header.
    pub fn unparsed_entities(&self) -> &[UnparsedEntity] {
        self.decoder.unparsed_entities()
    }
}

impl<R> Iterator for DocumentReader<R>
where
    R: Read,
{
    type Item = Result<NodeEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fail.is_some() {
            // fuse after the first reported error
            return None;
        }
        match self.read() {
            Ok(true) => Some(Ok(self.current.clone())),
            Ok(false) => None,
            Err(error) => Some(Err(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastinfoset_core::name::QualifiedName;

    // <x a="v" b="w"><c>hi</c></x>
    const DOCUMENT: &[u8] = &[
        0xE0, 0x00, 0x00, 0x01, 0x00, // header
        0x7C, 0x00, b'x', // element with attributes
        0x78, 0x00, b'a', 0x40, b'v', // a="v"
        0x78, 0x00, b'b', 0x40, b'w', // b="w"
        0xF0, // end of attributes
        0x3C, 0x00, b'c', // <c>
        0x91, b'h', b'i', // "hi"
        0xFF, // close c and x
        0xF0, // end of document
    ];

    #[test]
    fn cursor_walks_the_attribute_list_without_consuming_input() {
        let mut reader = DocumentReader::new(DOCUMENT);
        assert_eq!(reader.read_state(), ReadState::Initial);
        assert!(reader.read().unwrap());
        assert_eq!(reader.read_state(), ReadState::Interactive);
        assert_eq!(reader.node_type(), NodeType::Element);
        assert_eq!(reader.local_name(), "x");
        assert_eq!(reader.attribute_count(), 2);
        assert_eq!(reader.attribute(1), Some("w"));
        assert_eq!(reader.attribute_by_name("a"), Some("v"));
        assert_eq!(reader.attribute_by_qname("", "b"), Some("w"));

        assert!(reader.move_to_next_attribute());
        assert_eq!(reader.node_type(), NodeType::Attribute);
        assert_eq!(reader.local_name(), "a");
        assert_eq!(reader.value(), "v");
        assert_eq!(reader.depth(), 1);

        assert!(reader.read_attribute_value());
        assert_eq!(reader.node_type(), NodeType::Text);
        assert_eq!(reader.value(), "v");
        assert_eq!(reader.depth(), 2);
        assert!(!reader.read_attribute_value());

        assert!(reader.move_to_next_attribute());
        assert_eq!(reader.local_name(), "b");
        assert!(!reader.move_to_next_attribute());
        assert_eq!(reader.local_name(), "b");

        assert!(reader.move_to_element());
        assert_eq!(reader.node_type(), NodeType::Element);
        assert!(!reader.move_to_element());

        // the cursor did not consume events
        assert!(reader.read().unwrap());
        assert_eq!(reader.local_name(), "c");
        assert_eq!(reader.depth(), 1);
    }

    #[test]
    fn iterator_yields_the_event_stream() {
        let reader = DocumentReader::new(DOCUMENT);
        let events: Vec<NodeEvent> = reader.map(|e| e.unwrap()).collect();
        let kinds: Vec<NodeType> = events.iter().map(|e| e.node_type).collect();
        assert_eq!(
            kinds,
            vec![
                NodeType::Element,
                NodeType::Element,
                NodeType::Text,
                NodeType::EndElement,
                NodeType::EndElement,
                NodeType::EndDocument,
            ]
        );
        assert_eq!(events[1].name, QualifiedName::unqualified("c"));
    }

    #[test]
    fn errors_poison_the_reader_with_a_stable_kind() {
        let mut reader = DocumentReader::new(&[0xE0, 0x00, 0x00, 0x02][..]);
        let error = reader.read().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidMagic);
        assert_eq!(reader.read_state(), ReadState::Error);

        let error = reader.read().unwrap_err();
        assert!(matches!(error, Error::Poisoned { .. }));
        assert_eq!(error.kind(), ErrorKind::InvalidMagic);
    }

    #[test]
    fn close_fuses_the_reader() {
        let mut reader = DocumentReader::new(DOCUMENT);
        assert!(reader.read().unwrap());
        reader.close();
        assert_eq!(reader.read_state(), ReadState::Closed);
        assert!(!reader.read().unwrap());
    }
}
