//! In-scope namespace tracking for the document writer.
//!
//! The manager keeps a flat stack of prefix/URI bindings plus one frame per
//! open element recording where that element's bindings start. Closing an
//! element truncates the binding stack back to the recorded snapshot.

use fastinfoset_core::name::{
    QualifiedName, XMLNS_NAMESPACE_URI, XMLNS_PREFIX, XML_NAMESPACE_URI, XML_PREFIX,
};
use snafu::{Backtrace, Snafu};

/// Module-level error type:
/// for namespace binding violations.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("No namespace is bound to prefix {:?}", prefix))]
    UndefinedNamespaceForPrefix { prefix: String, backtrace: Backtrace },

    #[snafu(display("Binding {:?} to {:?} violates a reserved namespace", prefix, uri))]
    ReservedNamespace {
        prefix: String,
        uri: String,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone)]
struct Binding {
    prefix: String,
    uri: String,
}

#[derive(Debug, Copy, Clone)]
struct Frame {
    /// length of the binding stack when the element opened
    namespace_top: usize,
    /// counter feeding generated prefixes of this element
    prefix_counter: u32,
}

/// A namespace declaration made while resolving an element or attribute
/// name, to be carried on the element currently being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// The declared prefix; empty for a default namespace declaration.
    pub prefix: String,
    /// The namespace URI.
    pub uri: String,
}

/// Scoped prefix/URI mapping with prefix generation, used by the encoder.
#[derive(Debug, Default)]
pub struct NamespaceManager {
    bindings: Vec<Binding>,
    frames: Vec<Frame>,
}

impl NamespaceManager {
    /// Create a manager with no bindings in scope.
    pub fn new() -> Self {
        NamespaceManager::default()
    }

    /// The number of open element frames.
    pub fn element_depth(&self) -> usize {
        self.frames.len()
    }

    /// Open an element frame.
    pub fn push_frame(&mut self) {
        self.frames.push(Frame {
            namespace_top: self.bindings.len(),
            prefix_counter: 0,
        });
    }

    /// Close the innermost element frame, dropping its bindings.
    pub fn pop_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.bindings.truncate(frame.namespace_top);
        }
    }

    /// Resolve a prefix to the URI it is currently bound to.
    ///
    /// The empty prefix resolves to the current default namespace.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == XML_PREFIX {
            return Some(XML_NAMESPACE_URI);
        }
        if prefix == XMLNS_PREFIX {
            return Some(XMLNS_NAMESPACE_URI);
        }
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| b.uri.as_str())
    }

    /// Find a prefix currently bound to the given URI, preferring the most
    /// recent binding which is not shadowed by a later one.
    ///
    /// Returns the empty string when the URI is the current default
    /// namespace.
    pub fn lookup_prefix(&self, uri: &str) -> Option<&str> {
        if uri == XML_NAMESPACE_URI {
            return Some(XML_PREFIX);
        }
        self.bindings
            .iter()
            .rev()
            .filter(|b| b.uri == uri)
            .find(|b| self.resolve(&b.prefix) == Some(uri))
            .map(|b| b.prefix.as_str())
    }

    /// Bind a prefix to a URI in the current scope.
    ///
    /// Returns `false` when the pair is already the current binding and no
    /// new declaration is needed.
    pub fn declare(&mut self, prefix: &str, uri: &str) -> Result<bool> {
        snafu::ensure!(
            prefix != XMLNS_PREFIX && uri != XMLNS_NAMESPACE_URI,
            ReservedNamespaceSnafu { prefix, uri }
        );
        snafu::ensure!(
            (prefix == XML_PREFIX) == (uri == XML_NAMESPACE_URI),
            ReservedNamespaceSnafu { prefix, uri }
        );
        if self.resolve(prefix) == Some(uri) && !(prefix.is_empty() && uri.is_empty()) {
            return Ok(false);
        }
        self.bindings.push(Binding {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        });
        Ok(true)
    }

    /// Resolve the name of an element being started, declaring namespaces
    /// as needed. New declarations are appended to `declared`.
    pub fn element_name(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        uri: Option<&str>,
        declared: &mut Vec<NamespaceDecl>,
    ) -> Result<QualifiedName> {
        match (prefix, uri) {
            (prefix, None) => {
                let prefix = prefix.unwrap_or("");
                if prefix.is_empty() {
                    // inherit the default namespace, which may be none
                    let uri = self.resolve("").unwrap_or("").to_owned();
                    Ok(QualifiedName::new("", uri, local_name))
                } else {
                    let uri = self
                        .resolve(prefix)
                        .ok_or_else(|| {
                            UndefinedNamespaceForPrefixSnafu { prefix }.build()
                        })?
                        .to_owned();
                    Ok(QualifiedName::new(prefix, uri, local_name))
                }
            }
            (None, Some(uri)) => {
                if let Some(prefix) = self.lookup_prefix(uri) {
                    let prefix = prefix.to_owned();
                    return Ok(QualifiedName::new(prefix, uri, local_name));
                }
                if self.declare("", uri)? {
                    declared.push(NamespaceDecl {
                        prefix: String::new(),
                        uri: uri.to_owned(),
                    });
                }
                Ok(QualifiedName::new("", uri, local_name))
            }
            (Some(prefix), Some(uri)) => {
                if self.resolve(prefix) != Some(uri) {
                    if self.declare(prefix, uri)? {
                        declared.push(NamespaceDecl {
                            prefix: prefix.to_owned(),
                            uri: uri.to_owned(),
                        });
                    }
                }
                Ok(QualifiedName::new(prefix, uri, local_name))
            }
        }
    }

    /// Resolve the name of an attribute, declaring (and generating)
    /// prefixes as needed. Attributes never use the default namespace.
    pub fn attribute_name(
        &mut self,
        prefix: Option<&str>,
        local_name: &str,
        uri: Option<&str>,
        declared: &mut Vec<NamespaceDecl>,
    ) -> Result<QualifiedName> {
        match (prefix, uri) {
            (prefix, None) => {
                let prefix = prefix.unwrap_or("");
                if prefix.is_empty() {
                    Ok(QualifiedName::unqualified(local_name))
                } else {
                    let uri = self
                        .resolve(prefix)
                        .ok_or_else(|| {
                            UndefinedNamespaceForPrefixSnafu { prefix }.build()
                        })?
                        .to_owned();
                    Ok(QualifiedName::new(prefix, uri, local_name))
                }
            }
            (None, Some(uri)) if uri.is_empty() => Ok(QualifiedName::unqualified(local_name)),
            (None, Some(uri)) => {
                // a prefixed binding is required; the default namespace
                // does not apply to attributes
                let existing = self
                    .bindings
                    .iter()
                    .rev()
                    .filter(|b| b.uri == uri && !b.prefix.is_empty())
                    .find(|b| self.resolve(&b.prefix) == Some(uri))
                    .map(|b| b.prefix.clone());
                let prefix = match existing {
                    Some(prefix) => prefix,
                    None => {
                        let prefix = self.generate_prefix();
                        if self.declare(&prefix, uri)? {
                            declared.push(NamespaceDecl {
                                prefix: prefix.clone(),
                                uri: uri.to_owned(),
                            });
                        }
                        prefix
                    }
                };
                Ok(QualifiedName::new(prefix, uri, local_name))
            }
            (Some(prefix), Some(uri)) => {
                if prefix.is_empty() {
                    return self.attribute_name(None, local_name, Some(uri), declared);
                }
                if self.resolve(prefix) != Some(uri) {
                    if self.declare(prefix, uri)? {
                        declared.push(NamespaceDecl {
                            prefix: prefix.to_owned(),
                            uri: uri.to_owned(),
                        });
                    }
                }
                Ok(QualifiedName::new(prefix, uri, local_name))
            }
        }
    }

    /// Produce a prefix of the form `d{depth}p{counter}` which is not
    /// currently bound.
    fn generate_prefix(&mut self) -> String {
        let depth = self.frames.len();
        loop {
            let counter = match self.frames.last_mut() {
                Some(frame) => {
                    frame.prefix_counter += 1;
                    frame.prefix_counter
                }
                None => 1,
            };
            let prefix = format!("d{}p{}", depth, counter);
            if self.resolve(&prefix).is_none() {
                return prefix;
            }
            if self.frames.is_empty() {
                return prefix;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_are_scoped_to_their_frame() {
        let mut manager = NamespaceManager::new();
        manager.push_frame();
        manager.declare("p", "urn:a").unwrap();
        assert_eq!(manager.resolve("p"), Some("urn:a"));

        manager.push_frame();
        manager.declare("p", "urn:b").unwrap();
        assert_eq!(manager.resolve("p"), Some("urn:b"));
        manager.pop_frame();

        assert_eq!(manager.resolve("p"), Some("urn:a"));
        manager.pop_frame();
        assert_eq!(manager.resolve("p"), None);
    }

    #[test]
    fn lookup_prefix_skips_shadowed_bindings() {
        let mut manager = NamespaceManager::new();
        manager.push_frame();
        manager.declare("p", "urn:a").unwrap();
        manager.push_frame();
        manager.declare("p", "urn:b").unwrap();

        // the outer binding of urn:a is shadowed by p -> urn:b
        assert_eq!(manager.lookup_prefix("urn:a"), None);
        assert_eq!(manager.lookup_prefix("urn:b"), Some("p"));
    }

    #[test]
    fn lookup_prefix_reports_the_default_namespace() {
        let mut manager = NamespaceManager::new();
        manager.push_frame();
        manager.declare("", "urn:default").unwrap();
        assert_eq!(manager.lookup_prefix("urn:default"), Some(""));
    }

    #[test]
    fn element_name_reuses_or_declares() {
        let mut manager = NamespaceManager::new();
        let mut declared = Vec::new();
        manager.push_frame();

        let name = manager
            .element_name(Some("p"), "root", Some("urn:a"), &mut declared)
            .unwrap();
        assert_eq!(name, QualifiedName::new("p", "urn:a", "root"));
        assert_eq!(
            declared,
            vec![NamespaceDecl {
                prefix: "p".into(),
                uri: "urn:a".into(),
            }]
        );

        // same pair in scope: no new declaration
        declared.clear();
        manager.push_frame();
        let name = manager
            .element_name(Some("p"), "child", Some("urn:a"), &mut declared)
            .unwrap();
        assert_eq!(name.prefix, "p");
        assert!(declared.is_empty());
    }

    #[test]
    fn element_without_uri_requires_a_resolvable_prefix() {
        let mut manager = NamespaceManager::new();
        let mut declared = Vec::new();
        manager.push_frame();
        assert!(matches!(
            manager.element_name(Some("q"), "x", None, &mut declared),
            Err(Error::UndefinedNamespaceForPrefix { .. })
        ));
        // unprefixed and no URI: plain unqualified name
        let name = manager.element_name(None, "x", None, &mut declared).unwrap();
        assert_eq!(name, QualifiedName::unqualified("x"));
    }

    #[test]
    fn attribute_prefixes_are_generated_when_missing() {
        let mut manager = NamespaceManager::new();
        let mut declared = Vec::new();
        manager.push_frame();
        let name = manager
            .attribute_name(None, "id", Some("urn:a"), &mut declared)
            .unwrap();
        assert_eq!(name.prefix, "d1p1");
        assert_eq!(declared.len(), 1);

        // second attribute in the same namespace reuses the prefix
        declared.clear();
        let name = manager
            .attribute_name(None, "kind", Some("urn:a"), &mut declared)
            .unwrap();
        assert_eq!(name.prefix, "d1p1");
        assert!(declared.is_empty());
    }

    #[test]
    fn reserved_namespaces_cannot_be_rebound() {
        let mut manager = NamespaceManager::new();
        manager.push_frame();
        assert!(matches!(
            manager.declare("xmlns", "urn:a"),
            Err(Error::ReservedNamespace { .. })
        ));
        assert!(matches!(
            manager.declare("p", XMLNS_NAMESPACE_URI),
            Err(Error::ReservedNamespace { .. })
        ));
        assert!(matches!(
            manager.declare("xml", "urn:a"),
            Err(Error::ReservedNamespace { .. })
        ));
        // the canonical xml binding is tolerated and already in scope
        assert_eq!(manager.declare("xml", XML_NAMESPACE_URI).unwrap(), false);
    }
}
