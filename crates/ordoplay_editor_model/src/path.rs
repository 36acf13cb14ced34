// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural paths from a root node to a nested node.

use crate::arena::NodeHandle;
use crate::container::NodeContainer;
use crate::error::{AddressingError, Result};
use crate::index::NodeIndex;
use crate::node::NodeKind;
use ordoplay_editor_reflect::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TARGET_TAG: AtomicU64 = AtomicU64::new(1);

/// One hop of a path
///
/// Target hops carry a tag minted when the hop is pushed. The tag is ignored
/// by equality and hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PathElement {
    /// From an object node to one of its members
    Member(String),
    /// From a member node to its target
    Target {
        /// Tag of this hop
        #[serde(skip)]
        tag: u64,
    },
    /// From a collection or dictionary node to the target of an item
    Index(NodeIndex),
}

impl PathElement {
    /// New target hop
    pub fn target() -> Self {
        Self::Target {
            tag: NEXT_TARGET_TAG.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Node kind this hop starts from
    pub fn source_kind(&self) -> NodeKind {
        match self {
            Self::Target { .. } => NodeKind::Member,
            Self::Member(_) | Self::Index(_) => NodeKind::Object,
        }
    }
}

impl PartialEq for PathElement {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Member(a), Self::Member(b)) => a == b,
            (Self::Target { .. }, Self::Target { .. }) => true,
            (Self::Index(a), Self::Index(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PathElement {}

impl Hash for PathElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Member(name) => name.hash(state),
            Self::Target { .. } => {}
            Self::Index(index) => index.hash(state),
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(name) => write!(f, ".{name}"),
            Self::Target { .. } => f.write_str("->"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A root node plus a sequence of hops
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphNodePath {
    root: NodeHandle,
    elements: Vec<PathElement>,
}

impl GraphNodePath {
    /// Empty path denoting `root` itself
    pub fn new(root: NodeHandle) -> Self {
        Self {
            root,
            elements: Vec::new(),
        }
    }

    /// Root node
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Hops in order
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Number of hops
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check whether the path denotes its root
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Append a member hop
    pub fn push_member(&mut self, name: impl Into<String>) {
        self.elements.push(PathElement::Member(name.into()));
    }

    /// Append a target hop
    pub fn push_target(&mut self) {
        self.elements.push(PathElement::target());
    }

    /// Append an index hop
    pub fn push_index(&mut self, index: NodeIndex) {
        self.elements.push(PathElement::Index(index));
    }

    /// Remove the last hop
    pub fn pop(&mut self) -> Option<PathElement> {
        self.elements.pop()
    }

    /// Copy of this path with a member hop appended
    pub fn with_member(&self, name: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push_member(name);
        path
    }

    /// Copy of this path with a target hop appended
    pub fn with_target(&self) -> Self {
        let mut path = self.clone();
        path.push_target();
        path
    }

    /// Copy of this path with an index hop appended
    pub fn with_index(&self, index: NodeIndex) -> Self {
        let mut path = self.clone();
        path.push_index(index);
        path
    }

    /// Path without its last hop; `None` for an empty path
    pub fn parent(&self) -> Option<Self> {
        let mut path = self.clone();
        path.pop()?;
        Some(path)
    }

    /// Walk the hops from the root
    ///
    /// Returns `None` only when the final hop yields nothing, e.g. a member
    /// holding null. A missing intermediate hop is an error.
    pub fn resolve(&self, container: &NodeContainer) -> Result<Option<NodeHandle>> {
        let mut current = self.root;
        let last = self.elements.len().saturating_sub(1);
        for (position, element) in self.elements.iter().enumerate() {
            let next = match element {
                PathElement::Member(name) => Some(container.member(current, name)?),
                PathElement::Target { .. } => container.target(current)?,
                PathElement::Index(index) => container.indexed_target(current, index)?,
            };
            match next {
                Some(node) => current = node,
                None if position == last => return Ok(None),
                None => {
                    return Err(AddressingError::UnresolvedHop {
                        position,
                        remaining: last - position,
                    }
                    .into())
                }
            }
        }
        Ok(Some(current))
    }

    /// Resolve to a node that must exist
    pub fn resolve_node(&self, container: &NodeContainer) -> Result<NodeHandle> {
        self.resolve(container)?.ok_or_else(|| {
            AddressingError::UnresolvedHop {
                position: self.elements.len().saturating_sub(1),
                remaining: 0,
            }
            .into()
        })
    }

    /// Accessor for reading or writing the value this path denotes
    ///
    /// Index hops address the item through its owner, target hops through the
    /// member holding the reference, so the accessor stays valid even when
    /// the item or target is null.
    pub fn accessor(&self, container: &NodeContainer) -> Result<NodeAccessor> {
        let Some(parent) = self.parent() else {
            return Ok(NodeAccessor::new(self.root, NodeIndex::Empty));
        };
        match self.elements.last() {
            Some(PathElement::Index(index)) => {
                Ok(NodeAccessor::new(parent.resolve_node(container)?, index.clone()))
            }
            Some(PathElement::Target { .. }) => {
                Ok(NodeAccessor::new(parent.resolve_node(container)?, NodeIndex::Empty))
            }
            _ => Ok(NodeAccessor::new(self.resolve_node(container)?, NodeIndex::Empty)),
        }
    }
}

impl fmt::Display for GraphNodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for element in &self.elements {
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

/// A node and an optional index into it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAccessor {
    /// Accessed node
    pub node: NodeHandle,
    /// Item index, empty for the node itself
    pub index: NodeIndex,
}

impl NodeAccessor {
    /// Create an accessor
    pub fn new(node: NodeHandle, index: NodeIndex) -> Self {
        Self { node, index }
    }

    /// Read the accessed value
    pub fn retrieve(&self, container: &NodeContainer) -> Result<Value> {
        container.retrieve_at(self.node, &self.index)
    }

    /// Write the accessed value
    pub fn update(&self, container: &NodeContainer, value: impl Into<Value>) -> Result<()> {
        container.update_at(self.node, value, &self.index)
    }
}
