// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error taxonomy of the node model.
//!
//! Every invalid state is a hard failure. Shape violations stop construction,
//! addressing errors flag caller logic mistakes, and consistency errors mean
//! the graph disagrees with the data it models and can no longer be trusted.

use crate::arena::NodeHandle;
use crate::index::NodeIndex;
use crate::node::{NodeId, NodeKind};
use ordoplay_editor_reflect::{ReflectError, TypeName};
use thiserror::Error;

/// The modeled data does not have a shape the graph can represent
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeViolation {
    /// Construction of the node already finished
    #[error("Node {node} is sealed, cannot add member '{member}'")]
    Sealed {
        /// Sealed node
        node: NodeId,
        /// Rejected member
        member: String,
    },

    /// Member names are unique per object node
    #[error("Node {node} already has a member named '{member}'")]
    DuplicateMember {
        /// Owning node
        node: NodeId,
        /// Duplicated name
        member: String,
    },

    /// Item-reference holders do not own members
    #[error("Node {node} holds item references and cannot own member '{member}'")]
    MembersOnItemHolder {
        /// Owning node
        node: NodeId,
        /// Rejected member
        member: String,
    },

    /// Collection lacks positional get/set, or the node is not a collection
    #[error("Unsupported collection: {0}")]
    UnsupportedCollection(TypeName),

    /// Dictionary keys must be primitive
    #[error("Dictionary {dictionary} has non-primitive key type {key}")]
    NonPrimitiveKey {
        /// Dictionary type
        dictionary: TypeName,
        /// Offending key type
        key: TypeName,
    },

    /// Primitives and null are never modeled as standalone nodes
    #[error("Cannot build a node for a value of type {0}")]
    PrimitiveRoot(TypeName),
}

/// A node or value was addressed in a way the graph cannot honor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AddressingError {
    /// Object nodes can only have their members or items replaced
    #[error("Cannot replace object node {0} itself, update a member or an item")]
    EmptyIndexUpdate(NodeId),

    /// Operation requires a different kind of node
    #[error("Expected a {expected} node, found a {found} node")]
    WrongNodeKind {
        /// Required kind
        expected: NodeKind,
        /// Actual kind
        found: NodeKind,
    },

    /// Member lookup failed
    #[error("Node {node} has no member '{member}'")]
    MemberNotFound {
        /// Owning node
        node: NodeId,
        /// Requested name
        member: String,
    },

    /// Index is not valid for the node
    #[error("Node {node} has no item at {index}")]
    IndexNotFound {
        /// Indexed node
        node: NodeId,
        /// Requested index
        index: NodeIndex,
    },

    /// Dereferenced a null reference
    #[error("Member node {0} has no target")]
    NullTarget(NodeId),

    /// A path hop yielded nothing while more hops remain
    #[error("Path hop {position} resolved to nothing with {remaining} hop(s) remaining")]
    UnresolvedHop {
        /// Zero-based hop position
        position: usize,
        /// Hops left after the failing one
        remaining: usize,
    },

    /// Handle refers to a node that no longer exists
    #[error("Stale node handle {0}")]
    StaleHandle(NodeHandle),
}

/// The graph contradicts an assumption the container relies on
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Graph consistency error: expected {expected}, observed {observed}")]
pub struct ConsistencyError {
    /// What the container assumed
    pub expected: String,
    /// What it found
    pub observed: String,
}

impl ConsistencyError {
    /// Create a consistency error
    pub fn new(expected: impl Into<String>, observed: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            observed: observed.into(),
        }
    }
}

/// Error raised by node model operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Shape violation
    #[error(transparent)]
    Shape(#[from] ShapeViolation),

    /// Addressing error
    #[error(transparent)]
    Addressing(#[from] AddressingError),

    /// Consistency error
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    /// Value access failed
    #[error(transparent)]
    Reflect(#[from] ReflectError),

    /// Member kind is fixed after the first build
    #[error("Member '{member}' cannot switch between reference and primitive values")]
    MemberKindChanged {
        /// Member name
        member: String,
        /// Whether the member held a reference before the update
        was_reference: bool,
    },

    /// Source instance of an object node is gone
    #[error("Source object of node {0} has been dropped")]
    ObjectDropped(NodeId),
}

/// Result type for node model operations
pub type Result<T> = std::result::Result<T, GraphError>;
