//! Metadata entries and groups

use crate::error::{Error, ErrorCode, Result};

/// Default metadata value type
pub const DEFAULT_METADATA_TYPE: &str = "xs:string";

/// A single metadata entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaData {
    /// Namespace URI of the name, empty for well known core names
    pub namespace: String,
    /// Local name
    pub name: String,
    /// Value text
    pub value: String,
    /// Value type, `xs:string` unless given
    pub data_type: String,
    /// Producer asked consumers to keep this entry
    pub preserve: bool,
}

impl MetaData {
    /// Create an entry with the default type and no preserve flag
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            value: value.into(),
            data_type: DEFAULT_METADATA_TYPE.to_string(),
            preserve: false,
        }
    }

    /// `namespace:name`, or just `name` without namespace
    pub fn key(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.namespace, self.name)
        }
    }
}

/// Ordered metadata entries, unique by `(namespace, name)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaDataGroup {
    entries: Vec<MetaData>,
}

impl MetaDataGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    ///
    /// Fails with `DuplicateMetadata` when the key is already present and
    /// with `InvalidMetadata` when the name is empty.
    pub fn add_metadata(&mut self, entry: MetaData) -> Result<&MetaData> {
        if entry.name.is_empty() {
            return Err(Error::model(ErrorCode::InvalidMetadata, "metadata name is empty"));
        }
        if self.has(&entry.namespace, &entry.name) {
            return Err(Error::model(
                ErrorCode::DuplicateMetadata,
                format!("metadata '{}' already exists", entry.key()),
            ));
        }
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// True if `(namespace, name)` is present
    pub fn has(&self, namespace: &str, name: &str) -> bool {
        self.get(namespace, name).is_some()
    }

    /// Entry by key
    pub fn get(&self, namespace: &str, name: &str) -> Option<&MetaData> {
        self.entries
            .iter()
            .find(|m| m.namespace == namespace && m.name == name)
    }

    /// Remove an entry by key, returning it
    pub fn remove(&mut self, namespace: &str, name: &str) -> Option<MetaData> {
        let index = self
            .entries
            .iter()
            .position(|m| m.namespace == namespace && m.name == name)?;
        Some(self.entries.remove(index))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &MetaData> {
        self.entries.iter()
    }
}
