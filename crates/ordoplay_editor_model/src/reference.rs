// SPDX-License-Identifier: MIT OR Apache-2.0
//! References from the graph to the nodes modeling referenced values.

use crate::arena::NodeHandle;
use crate::index::NodeIndex;
use ordoplay_editor_reflect::TypeName;

/// Single reference held by a member node
///
/// A null target is valid and means the member currently holds null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectReference {
    target: Option<NodeHandle>,
}

impl ObjectReference {
    /// Create a reference
    pub fn new(target: Option<NodeHandle>) -> Self {
        Self { target }
    }

    /// Node modeling the referenced value
    pub fn target(&self) -> Option<NodeHandle> {
        self.target
    }

    /// Retarget the reference
    pub fn set_target(&mut self, target: Option<NodeHandle>) {
        self.target = target;
    }

    /// Check for a null target
    pub fn is_null(&self) -> bool {
        self.target.is_none()
    }
}

/// Per-index references held by a collection or dictionary node
///
/// Entries are kept in the order of the modeled collection.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerableReference {
    element_type: TypeName,
    entries: Vec<(NodeIndex, ObjectReference)>,
}

impl EnumerableReference {
    /// Create an empty reference for items of the given declared type
    pub fn new(element_type: impl Into<TypeName>) -> Self {
        Self {
            element_type: element_type.into(),
            entries: Vec::new(),
        }
    }

    /// Declared item type
    pub fn element_type(&self) -> &TypeName {
        &self.element_type
    }

    /// Tracked indices in order
    pub fn indices(&self) -> impl Iterator<Item = &NodeIndex> {
        self.entries.iter().map(|(index, _)| index)
    }

    /// Reference at an index
    pub fn get(&self, index: &NodeIndex) -> Option<&ObjectReference> {
        self.entries.iter().find(|(i, _)| i == index).map(|(_, r)| r)
    }

    /// Check whether an index is tracked
    pub fn has_index(&self, index: &NodeIndex) -> bool {
        self.get(index).is_some()
    }

    /// Set the reference at an index, appending untracked indices
    ///
    /// Returns the previous reference.
    pub fn set(&mut self, index: NodeIndex, reference: ObjectReference) -> Option<ObjectReference> {
        match self.entries.iter_mut().find(|(i, _)| *i == index) {
            Some((_, slot)) => Some(std::mem::replace(slot, reference)),
            None => {
                self.entries.push((index, reference));
                None
            }
        }
    }

    /// Stop tracking an index
    pub fn remove(&mut self, index: &NodeIndex) -> Option<ObjectReference> {
        let position = self.entries.iter().position(|(i, _)| i == index)?;
        Some(self.entries.remove(position).1)
    }

    /// Order entries like `order`; untracked indices in `order` are ignored
    pub fn reorder(&mut self, order: &[NodeIndex]) {
        self.entries.sort_by_key(|(index, _)| {
            order.iter().position(|i| i == index).unwrap_or(usize::MAX)
        });
    }

    /// Iterate entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&NodeIndex, &ObjectReference)> {
        self.entries.iter().map(|(i, r)| (i, r))
    }

    /// Number of tracked indices
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for no tracked indices
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
