//! Qualified names and the reserved XML namespaces.

use std::fmt;

/// The namespace URI bound to the `xml` prefix by the XML 1.0 specification.
/// It occupies index 1 of the namespace name vocabulary table.
pub const XML_NAMESPACE_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// The reserved prefix bound to [`XML_NAMESPACE_URI`].
/// It occupies index 1 of the prefix vocabulary table.
pub const XML_PREFIX: &str = "xml";

/// The namespace URI reserved for namespace declaration attributes.
/// It must never be bound to any other prefix than `xmlns`.
pub const XMLNS_NAMESPACE_URI: &str = "http://www.w3.org/2000/xmlns/";

/// The reserved prefix of namespace declaration attributes.
pub const XMLNS_PREFIX: &str = "xmlns";

/// A qualified XML name: the triple of prefix, namespace URI, and local
/// name. Any of the three components may be the empty string, meaning that
/// the component is absent.
///
/// Two qualified names are equal if and only if all three components are
/// equal. In particular, two names with the same local name but distinct
/// prefix or namespace are distinct entries in the name vocabulary tables.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// The namespace prefix, or empty when the name is unprefixed.
    pub prefix: String,
    /// The namespace URI, or empty when the name is in no namespace.
    pub namespace_uri: String,
    /// The local part of the name.
    pub local_name: String,
}

impl QualifiedName {
    /// Create a qualified name from its three components.
    pub fn new<P, U, L>(prefix: P, namespace_uri: U, local_name: L) -> Self
    where
        P: Into<String>,
        U: Into<String>,
        L: Into<String>,
    {
        QualifiedName {
            prefix: prefix.into(),
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
        }
    }

    /// Create a name with only a local part, in no namespace.
    pub fn unqualified<L>(local_name: L) -> Self
    where
        L: Into<String>,
    {
        QualifiedName {
            prefix: String::new(),
            namespace_uri: String::new(),
            local_name: local_name.into(),
        }
    }

    /// Whether this name carries a namespace prefix.
    pub fn has_prefix(&self) -> bool {
        !self.prefix.is_empty()
    }

    /// Whether this name is in a namespace.
    pub fn has_namespace(&self) -> bool {
        !self.namespace_uri.is_empty()
    }

    /// Whether this name is a namespace declaration attribute
    /// (`xmlns="..."` or `xmlns:p="..."`).
    pub fn is_namespace_declaration(&self) -> bool {
        self.prefix == XMLNS_PREFIX || (self.prefix.is_empty() && self.local_name == XMLNS_PREFIX)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.prefix.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{}:{}", self.prefix, self.local_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::QualifiedName;

    #[test]
    fn qualified_name_equality_is_over_the_full_triple() {
        let plain = QualifiedName::unqualified("item");
        let prefixed = QualifiedName::new("p", "urn:example", "item");
        let other_prefix = QualifiedName::new("q", "urn:example", "item");

        assert_eq!(plain, QualifiedName::unqualified("item"));
        assert_ne!(plain, prefixed);
        assert_ne!(prefixed, other_prefix);
    }

    #[test]
    fn display_uses_the_prefixed_form() {
        assert_eq!(QualifiedName::new("p", "urn:example", "item").to_string(), "p:item");
        assert_eq!(QualifiedName::unqualified("item").to_string(), "item");
    }
}
