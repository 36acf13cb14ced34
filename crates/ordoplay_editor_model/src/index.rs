// SPDX-License-Identifier: MIT OR Apache-2.0
//! Positions inside collections and dictionaries.

use ordoplay_editor_reflect::{Key, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Addresses an item within a collection or dictionary
///
/// `Empty` means "the node itself, not an item within it".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum NodeIndex {
    /// No index
    #[default]
    Empty,
    /// Position in a collection
    Int(usize),
    /// Key of a dictionary entry
    Key(Key),
}

impl NodeIndex {
    /// Index of a collection item
    pub fn new(position: usize) -> Self {
        Self::Int(position)
    }

    /// Index of a dictionary entry
    pub fn key(key: impl Into<Key>) -> Self {
        Self::Key(key.into())
    }

    /// Check for the empty index
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Position, if this indexes a collection
    pub fn as_int(&self) -> Option<usize> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Key, if this indexes a dictionary
    pub fn as_key(&self) -> Option<&Key> {
        match self {
            Self::Key(k) => Some(k),
            _ => None,
        }
    }

    /// The index as a value: null, an integer or the key
    pub fn value(&self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Int(i) => Value::Int(i64::try_from(*i).unwrap_or(i64::MAX)),
            Self::Key(k) => Value::from(k.clone()),
        }
    }
}

impl From<usize> for NodeIndex {
    fn from(position: usize) -> Self {
        Self::Int(position)
    }
}

impl From<Key> for NodeIndex {
    fn from(key: Key) -> Self {
        Self::Key(key)
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("[]"),
            Self::Int(i) => write!(f, "[{i}]"),
            Self::Key(k) => write!(f, "[{k}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_index() {
        let index = NodeIndex::default();
        assert!(index.is_empty());
        assert_eq!(index, NodeIndex::Empty);
        assert_eq!(index.value(), Value::Null);
    }

    #[test]
    fn test_index_equality_and_display() {
        assert_eq!(NodeIndex::new(2), NodeIndex::from(2));
        assert_ne!(NodeIndex::new(2), NodeIndex::key(2i64));
        assert_eq!(NodeIndex::key("a").as_key(), Some(&Key::from("a")));
        assert_eq!(NodeIndex::new(3).to_string(), "[3]");
        assert_eq!(NodeIndex::key("name").to_string(), "[\"name\"]");
    }
}
