// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the object graph.

use crate::arena::NodeHandle;
use crate::error::ShapeViolation;
use crate::index::NodeIndex;
use crate::reference::{EnumerableReference, ObjectReference};
use indexmap::IndexMap;
use ordoplay_editor_reflect::{StructValue, TypeDescriptor, TypeName, WeakObjectRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Models a reference-type instance
    Object,
    /// Models a struct value stored in a member or an item
    Boxed,
    /// Models one named member of an object or struct
    Member,
}

impl NodeKind {
    /// Object and boxed nodes both expose members and items
    pub fn is_object_like(&self) -> bool {
        matches!(self, Self::Object | Self::Boxed)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Object => "object",
            Self::Boxed => "boxed",
            Self::Member => "member",
        })
    }
}

/// Where the struct modeled by a boxed node is stored
///
/// Boxed nodes never cache their struct: reads and writes go through the
/// owner so the node always reflects the current value.
#[derive(Debug, Clone, PartialEq)]
pub enum BoxOwner {
    /// The struct is the value of a member node
    Member(NodeHandle),
    /// The struct is an item of a collection or dictionary node
    Item {
        /// Object node holding the item
        node: NodeHandle,
        /// Position or key of the item
        index: NodeIndex,
    },
    /// The struct was handed to the container directly and is owned by the node
    Detached(StructValue),
}

/// Where an object node reads its value from
#[derive(Debug, Clone)]
pub(crate) enum ObjectSource {
    Instance(WeakObjectRef),
    Boxed(BoxOwner),
}

#[derive(Debug, Clone)]
pub(crate) struct ObjectNodeData {
    pub(crate) source: ObjectSource,
    pub(crate) members: IndexMap<String, NodeHandle>,
    pub(crate) items: Option<EnumerableReference>,
    pub(crate) sealed: bool,
}

impl ObjectNodeData {
    pub(crate) fn new(source: ObjectSource) -> Self {
        Self {
            source,
            members: IndexMap::new(),
            items: None,
            sealed: false,
        }
    }

    /// Attach a member, enforcing sealing and name uniqueness
    pub(crate) fn add_member(
        &mut self,
        id: NodeId,
        name: &str,
        member: NodeHandle,
    ) -> Result<(), ShapeViolation> {
        if self.sealed {
            return Err(ShapeViolation::Sealed {
                node: id,
                member: name.to_string(),
            });
        }
        if self.items.is_some() {
            return Err(ShapeViolation::MembersOnItemHolder {
                node: id,
                member: name.to_string(),
            });
        }
        if self.members.contains_key(name) {
            return Err(ShapeViolation::DuplicateMember {
                node: id,
                member: name.to_string(),
            });
        }
        self.members.insert(name.to_string(), member);
        Ok(())
    }

    pub(crate) fn boxed_owner(&self) -> Option<&BoxOwner> {
        match &self.source {
            ObjectSource::Boxed(owner) => Some(owner),
            ObjectSource::Instance(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MemberNodeData {
    pub(crate) parent: NodeHandle,
    pub(crate) name: String,
    /// `None` while the member holds a primitive
    pub(crate) reference: Option<ObjectReference>,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Object(ObjectNodeData),
    Member(MemberNodeData),
}

/// A node stored in the container arena
#[derive(Debug, Clone)]
pub(crate) struct NodeEntry {
    pub(crate) id: NodeId,
    /// Declared member type for member nodes, runtime type for object nodes
    pub(crate) declared_type: TypeName,
    pub(crate) descriptor: TypeDescriptor,
    pub(crate) data: NodeData,
}

impl NodeEntry {
    pub(crate) fn object(descriptor: TypeDescriptor, source: ObjectSource) -> Self {
        Self {
            id: NodeId::new(),
            declared_type: descriptor.name.clone(),
            descriptor,
            data: NodeData::Object(ObjectNodeData::new(source)),
        }
    }

    pub(crate) fn member(
        declared_type: TypeName,
        descriptor: TypeDescriptor,
        parent: NodeHandle,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            declared_type,
            descriptor,
            data: NodeData::Member(MemberNodeData {
                parent,
                name: name.into(),
                reference: None,
            }),
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match &self.data {
            NodeData::Object(object) => match object.source {
                ObjectSource::Instance(_) => NodeKind::Object,
                ObjectSource::Boxed(_) => NodeKind::Boxed,
            },
            NodeData::Member(_) => NodeKind::Member,
        }
    }

    pub(crate) fn is_reference(&self) -> bool {
        match &self.data {
            NodeData::Object(object) => object.items.is_some(),
            NodeData::Member(member) => member.reference.is_some(),
        }
    }
}

/// Snapshot of a node's descriptive state
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    /// Handle of the node
    pub handle: NodeHandle,
    /// Unique node ID
    pub id: NodeId,
    /// Node kind
    pub kind: NodeKind,
    /// Declared type: the member's declared type for member nodes
    pub declared_type: TypeName,
    /// Type of the descriptor the node was built from
    pub type_name: TypeName,
    /// Whether the node currently holds a reference
    pub is_reference: bool,
    /// Whether construction finished
    pub sealed: bool,
    /// Member name, for member nodes
    pub name: Option<String>,
}

impl NodeInfo {
    pub(crate) fn from_entry(handle: NodeHandle, entry: &NodeEntry) -> Self {
        let (sealed, name) = match &entry.data {
            NodeData::Object(object) => (object.sealed, None),
            NodeData::Member(member) => (true, Some(member.name.clone())),
        };
        Self {
            handle,
            id: entry.id,
            kind: entry.kind(),
            declared_type: entry.declared_type.clone(),
            type_name: entry.descriptor.name.clone(),
            is_reference: entry.is_reference(),
            sealed,
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::NodeArena;

    #[test]
    fn test_node_ids_are_unique() {
        assert_ne!(NodeId::new(), NodeId::new());
    }

    #[test]
    fn test_add_member_rules() {
        let mut arena = NodeArena::new();
        let a = arena.insert(());
        let b = arena.insert(());
        let id = NodeId::new();
        let mut data = ObjectNodeData::new(ObjectSource::Boxed(BoxOwner::Detached(StructValue::new("S"))));

        data.add_member(id, "A", a).unwrap();
        assert!(matches!(
            data.add_member(id, "A", b),
            Err(ShapeViolation::DuplicateMember { .. })
        ));

        data.sealed = true;
        assert!(matches!(
            data.add_member(id, "B", b),
            Err(ShapeViolation::Sealed { .. })
        ));
        assert_eq!(data.members.len(), 1);
    }

    #[test]
    fn test_kind_follows_source() {
        let descriptor = TypeDescriptor::structure("S");
        let entry = NodeEntry::object(
            descriptor,
            ObjectSource::Boxed(BoxOwner::Detached(StructValue::new("S"))),
        );
        assert_eq!(entry.kind(), NodeKind::Boxed);
        assert!(entry.kind().is_object_like());
        assert!(!entry.is_reference());
    }
}
