//! Vocabulary tables: the insertion-ordered, 1-based index dictionaries
//! which Fast Infoset uses to compress repeated names and strings.
//!
//! Both sides of the codec grow their tables in lockstep: for a given
//! document, the reader must insert exactly the entries the writer inserted,
//! in the same order, so that wire indices resolve to the same strings.
//!
//! Tables hold at most 2^20 entries. Inserts beyond that capacity are
//! silently dropped; the codec keeps emitting such values literally.

use crate::name::{QualifiedName, XML_NAMESPACE_URI, XML_PREFIX};
use std::collections::HashMap;

/// Maximum number of entries of any single vocabulary table.
pub const MAX_TABLE_ENTRIES: usize = 1 << 20;

/// An insertion-ordered table of strings with 1-based wire indices.
#[derive(Debug, Default, Clone)]
pub struct StringTable {
    entries: Vec<String>,
    index: HashMap<String, u32>,
}

impl StringTable {
    /// Create an empty table.
    pub fn new() -> Self {
        StringTable::default()
    }

    /// The number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the 1-based index of a string.
    pub fn get(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    /// Resolve a 1-based index back to its string.
    pub fn resolve(&self, index: u32) -> Option<&str> {
        if index == 0 {
            return None;
        }
        self.entries.get(index as usize - 1).map(String::as_str)
    }

    /// Insert a string at the next index, returning the index it obtained.
    ///
    /// Returns the existing index when the value is already present, and
    /// `None` when the table is full and the insert was dropped.
    pub fn insert(&mut self, value: &str) -> Option<u32> {
        if let Some(index) = self.get(value) {
            return Some(index);
        }
        if self.entries.len() >= MAX_TABLE_ENTRIES {
            return None;
        }
        self.entries.push(value.to_owned());
        let index = self.entries.len() as u32;
        self.index.insert(value.to_owned(), index);
        Some(index)
    }
}

/// An insertion-ordered table of qualified names with 1-based wire indices.
///
/// Lookup resolves by full triple equality: entries with the same local
/// name but distinct prefix or namespace are distinct.
#[derive(Debug, Default, Clone)]
pub struct NameTable {
    entries: Vec<QualifiedName>,
    index: HashMap<QualifiedName, u32>,
}

impl NameTable {
    /// Create an empty table.
    pub fn new() -> Self {
        NameTable::default()
    }

    /// The number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the 1-based index of a name.
    pub fn get(&self, name: &QualifiedName) -> Option<u32> {
        self.index.get(name).copied()
    }

    /// Resolve a 1-based index back to its name.
    pub fn resolve(&self, index: u32) -> Option<&QualifiedName> {
        if index == 0 {
            return None;
        }
        self.entries.get(index as usize - 1)
    }

    /// Insert a name at the next index, returning the index it obtained.
    ///
    /// Returns the existing index when the name is already present, and
    /// `None` when the table is full and the insert was dropped.
    pub fn insert(&mut self, name: &QualifiedName) -> Option<u32> {
        if let Some(index) = self.get(name) {
            return Some(index);
        }
        if self.entries.len() >= MAX_TABLE_ENTRIES {
            return None;
        }
        self.entries.push(name.clone());
        let index = self.entries.len() as u32;
        self.index.insert(name.clone(), index);
        Some(index)
    }
}

/// The full set of vocabulary tables of one coding direction.
///
/// The reader and the writer each own one `Vocabulary` for the lifetime of
/// the document being coded. A fresh vocabulary pre-seeds the `xml` prefix
/// at prefix index 1 and the XML 1998 namespace at namespace index 1, as
/// required by X.891.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// PREFIX table.
    pub prefixes: StringTable,
    /// NAMESPACE NAME table.
    pub namespace_names: StringTable,
    /// LOCAL NAME table.
    pub local_names: StringTable,
    /// Element name surrogates, resolved by full qualified name.
    pub element_names: NameTable,
    /// Attribute name surrogates, resolved by full qualified name.
    pub attribute_names: NameTable,
    /// ATTRIBUTE VALUE table.
    pub attribute_values: StringTable,
    /// CONTENT CHARACTER CHUNK table.
    pub character_chunks: StringTable,
    /// OTHER NCNAME table (processing instruction targets, entity names,
    /// notation names).
    pub other_ncnames: StringTable,
    /// OTHER STRING table (comment and processing instruction content,
    /// version strings).
    pub other_strings: StringTable,
    /// OTHER URI table (document type and entity identifiers).
    pub other_uris: StringTable,
}

impl Vocabulary {
    /// Create a vocabulary with the mandatory pre-seeded entries.
    pub fn new() -> Self {
        let mut prefixes = StringTable::new();
        let mut namespace_names = StringTable::new();
        prefixes.insert(XML_PREFIX);
        namespace_names.insert(XML_NAMESPACE_URI);
        Vocabulary {
            prefixes,
            namespace_names,
            local_names: StringTable::new(),
            element_names: NameTable::new(),
            attribute_names: NameTable::new(),
            attribute_values: StringTable::new(),
            character_chunks: StringTable::new(),
            other_ncnames: StringTable::new(),
            other_strings: StringTable::new(),
            other_uris: StringTable::new(),
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary::new()
    }
}

/// A pre-shared vocabulary addressed by URI.
///
/// External vocabularies are registered with the codec before construction.
/// When a document references one, the codec copies its contents into the
/// per-stream vocabulary, so that coding may extend the tables without
/// mutating the shared template.
#[derive(Debug, Clone)]
pub struct ExternalVocabulary {
    uri: String,
    template: Vocabulary,
}

impl ExternalVocabulary {
    /// Create an external vocabulary from its URI and table contents.
    pub fn new<U>(uri: U, template: Vocabulary) -> Self
    where
        U: Into<String>,
    {
        ExternalVocabulary {
            uri: uri.into(),
            template,
        }
    }

    /// The URI under which this vocabulary is published.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Copy the template into a fresh per-stream vocabulary.
    pub fn instantiate(&self) -> Vocabulary {
        self.template.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_table_issues_indices_in_insertion_order() {
        let mut table = StringTable::new();
        assert_eq!(table.insert("a"), Some(1));
        assert_eq!(table.insert("b"), Some(2));
        assert_eq!(table.insert("a"), Some(1));
        assert_eq!(table.get("b"), Some(2));
        assert_eq!(table.resolve(2), Some("b"));
        assert_eq!(table.resolve(0), None);
        assert_eq!(table.resolve(3), None);
    }

    #[test]
    fn name_table_distinguishes_same_local_name() {
        let mut table = NameTable::new();
        let a = QualifiedName::new("p", "urn:a", "item");
        let b = QualifiedName::new("q", "urn:b", "item");
        assert_eq!(table.insert(&a), Some(1));
        assert_eq!(table.insert(&b), Some(2));
        assert_eq!(table.get(&a), Some(1));
        assert_eq!(table.get(&b), Some(2));
        assert_eq!(table.resolve(1), Some(&a));
    }

    #[test]
    fn vocabulary_pre_seeds_the_xml_names() {
        let vocabulary = Vocabulary::new();
        assert_eq!(vocabulary.prefixes.get(XML_PREFIX), Some(1));
        assert_eq!(vocabulary.namespace_names.get(XML_NAMESPACE_URI), Some(1));
        assert!(vocabulary.local_names.is_empty());
    }

    #[test]
    fn external_vocabulary_copies_do_not_share_growth() {
        let mut template = Vocabulary::new();
        template.local_names.insert("root");
        let external = ExternalVocabulary::new("urn:vocab", template);

        let mut first = external.instantiate();
        first.local_names.insert("extra");
        let second = external.instantiate();

        assert_eq!(first.local_names.len(), 2);
        assert_eq!(second.local_names.len(), 1);
        assert_eq!(second.local_names.get("root"), Some(1));
    }
}
