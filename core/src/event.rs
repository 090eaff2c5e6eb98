//! Interpretation of Fast Infoset documents as streams of node events.
//!
//! The parser yields one [`NodeEvent`] per information item in document
//! order; the writer consumes the same vocabulary of events. This is the
//! contract which the external XML reader and writer adapters build upon.

use crate::name::QualifiedName;
use smallvec::SmallVec;
use std::fmt;

/// The kind of a node event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// No event has been produced yet.
    None,
    /// The start of an element, carrying its attribute list.
    Element,
    /// An attribute of the current element; reported only by reader
    /// cursors, never as a parsed event.
    Attribute,
    /// The end of an element.
    EndElement,
    /// A character data chunk.
    Text,
    /// A character data chunk carried through the CDATA encoding algorithm.
    Cdata,
    /// A comment.
    Comment,
    /// A processing instruction; the target is the event name's local part.
    ProcessingInstruction,
    /// A document type declaration.
    DocumentType,
    /// An unexpanded entity reference.
    EntityReference,
    /// The end of the document.
    EndDocument,
}

impl NodeType {
    /// Whether events of this kind may carry character data in `value`.
    pub fn has_value(self) -> bool {
        matches!(
            self,
            NodeType::Text
                | NodeType::Cdata
                | NodeType::Comment
                | NodeType::ProcessingInstruction
        )
    }
}

/// A single attribute of an element event, in the order seen on the wire.
///
/// Namespace declarations are represented as attributes with the `xmlns`
/// prefix (or the `xmlns` local name for default namespace declarations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The qualified name of the attribute.
    pub name: QualifiedName,
    /// The attribute value.
    pub value: String,
}

impl Attribute {
    /// Create an attribute from a name and a value.
    pub fn new<V>(name: QualifiedName, value: V) -> Self
    where
        V: Into<String>,
    {
        Attribute {
            name,
            value: value.into(),
        }
    }
}

/// A node event produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEvent {
    /// The kind of node.
    pub node_type: NodeType,
    /// The element nesting depth at which the event occurred.
    /// The document root is at depth 0.
    pub depth: u32,
    /// The qualified name of the node, where applicable
    /// (element and end-element events, processing instruction targets,
    /// entity reference names).
    pub name: QualifiedName,
    /// The character data of the node, where applicable.
    pub value: String,
    /// The attributes of an element event, in wire order.
    pub attributes: SmallVec<[Attribute; 8]>,
}

impl NodeEvent {
    /// Create an event with no name, value, nor attributes.
    pub fn of(node_type: NodeType, depth: u32) -> Self {
        NodeEvent {
            node_type,
            depth,
            name: QualifiedName::default(),
            value: String::new(),
            attributes: SmallVec::new(),
        }
    }

    /// Retrieve the attribute at the given zero-based position.
    pub fn attribute(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    /// Retrieve the first attribute with the given local name.
    pub fn attribute_by_name(&self, local_name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.local_name == local_name)
    }

    /// Retrieve the first attribute with the given namespace URI and
    /// local name.
    pub fn attribute_by_qname(&self, namespace_uri: &str, local_name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace_uri == namespace_uri && a.name.local_name == local_name)
    }
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.node_type {
            NodeType::Element => write!(f, "Element({})", self.name),
            NodeType::EndElement => write!(f, "EndElement({})", self.name),
            NodeType::Text | NodeType::Cdata => {
                write!(f, "{:?}({} chars)", self.node_type, self.value.len())
            }
            other => write!(f, "{:?}", other),
        }
    }
}
