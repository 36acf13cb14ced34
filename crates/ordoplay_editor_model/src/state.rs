// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mutable state behind a node container.
//!
//! Everything here assumes the caller holds the container lock. Values are
//! always read through the live instances: member nodes read their parent's
//! field, boxed nodes read through their owner chain.

use crate::arena::{NodeArena, NodeHandle};
use crate::error::{AddressingError, ConsistencyError, GraphError, Result, ShapeViolation};
use crate::index::NodeIndex;
use crate::node::{
    BoxOwner, MemberNodeData, NodeData, NodeEntry, NodeKind, ObjectNodeData, ObjectSource,
};
use ordoplay_editor_reflect::{InstanceData, ObjectKey, ObjectRef, Value, WeakObjectRef};
use std::collections::HashMap;

/// Identity map entry: the weak handle guards against address reuse
#[derive(Debug, Clone)]
pub(crate) struct IdentityEntry {
    pub(crate) object: WeakObjectRef,
    pub(crate) node: NodeHandle,
}

#[derive(Debug, Default)]
pub(crate) struct GraphState {
    pub(crate) nodes: NodeArena<NodeEntry>,
    pub(crate) identity: HashMap<ObjectKey, IdentityEntry>,
}

impl GraphState {
    pub(crate) fn entry(&self, node: NodeHandle) -> Result<&NodeEntry> {
        self.nodes
            .get(node)
            .ok_or(GraphError::Addressing(AddressingError::StaleHandle(node)))
    }

    pub(crate) fn entry_mut(&mut self, node: NodeHandle) -> Result<&mut NodeEntry> {
        self.nodes
            .get_mut(node)
            .ok_or(GraphError::Addressing(AddressingError::StaleHandle(node)))
    }

    pub(crate) fn object(&self, node: NodeHandle) -> Result<&ObjectNodeData> {
        let entry = self.entry(node)?;
        match &entry.data {
            NodeData::Object(object) => Ok(object),
            NodeData::Member(_) => Err(wrong_kind_object(entry)),
        }
    }

    pub(crate) fn object_mut(&mut self, node: NodeHandle) -> Result<&mut ObjectNodeData> {
        let entry = self.entry_mut(node)?;
        let found = entry.kind();
        match &mut entry.data {
            NodeData::Object(object) => Ok(object),
            NodeData::Member(_) => Err(AddressingError::WrongNodeKind {
                expected: NodeKind::Object,
                found,
            }
            .into()),
        }
    }

    pub(crate) fn member(&self, node: NodeHandle) -> Result<&MemberNodeData> {
        let entry = self.entry(node)?;
        match &entry.data {
            NodeData::Member(member) => Ok(member),
            NodeData::Object(_) => Err(AddressingError::WrongNodeKind {
                expected: NodeKind::Member,
                found: entry.kind(),
            }
            .into()),
        }
    }

    pub(crate) fn member_mut(&mut self, node: NodeHandle) -> Result<&mut MemberNodeData> {
        let entry = self.entry_mut(node)?;
        let found = entry.kind();
        match &mut entry.data {
            NodeData::Member(member) => Ok(member),
            NodeData::Object(_) => Err(AddressingError::WrongNodeKind {
                expected: NodeKind::Member,
                found,
            }
            .into()),
        }
    }

    /// Node already modeling this exact instance, if any
    pub(crate) fn lookup_instance(&self, object: &ObjectRef) -> Option<NodeHandle> {
        let entry = self.identity.get(&object.key())?;
        let alive = entry.object.upgrade()?;
        if !alive.ptr_eq(object) || !self.nodes.contains(entry.node) {
            return None;
        }
        Some(entry.node)
    }

    /// Live instance modeled by an object node
    pub(crate) fn instance(&self, node: NodeHandle) -> Result<ObjectRef> {
        let entry = self.entry(node)?;
        match &entry.data {
            NodeData::Object(ObjectNodeData {
                source: ObjectSource::Instance(weak),
                ..
            }) => weak.upgrade().ok_or(GraphError::ObjectDropped(entry.id)),
            _ => Err(ShapeViolation::UnsupportedCollection(entry.descriptor.name.clone()).into()),
        }
    }

    /// Current value modeled by a node
    pub(crate) fn value_of(&self, node: NodeHandle) -> Result<Value> {
        let entry = self.entry(node)?;
        match &entry.data {
            NodeData::Member(member) => {
                let parent = self.value_of(member.parent)?;
                match parent {
                    Value::Object(object) => Ok(object.field(&member.name)?),
                    Value::Struct(value) => Ok(value.field(&member.name)?.clone()),
                    other => Err(ConsistencyError::new(
                        format!("object or struct owning member '{}'", member.name),
                        format!("{other:?}"),
                    )
                    .into()),
                }
            }
            NodeData::Object(object) => match &object.source {
                ObjectSource::Instance(weak) => weak
                    .upgrade()
                    .map(Value::Object)
                    .ok_or(GraphError::ObjectDropped(entry.id)),
                ObjectSource::Boxed(BoxOwner::Member(owner)) => self.value_of(*owner),
                ObjectSource::Boxed(BoxOwner::Item { node, index }) => self.value_at(*node, index),
                ObjectSource::Boxed(BoxOwner::Detached(value)) => Ok(Value::Struct(value.clone())),
            },
        }
    }

    /// Value of a node, or of one of its items when `index` is not empty
    pub(crate) fn value_at(&self, node: NodeHandle, index: &NodeIndex) -> Result<Value> {
        if index.is_empty() {
            return self.value_of(node);
        }
        let entry = self.entry(node)?;
        match self.value_of(node)? {
            Value::Object(object) => match index {
                NodeIndex::Int(position) => Ok(object.item(*position)?),
                NodeIndex::Key(key) => Ok(object.entry(key)?),
                NodeIndex::Empty => Ok(Value::Object(object)),
            },
            Value::Null => Err(AddressingError::IndexNotFound {
                node: entry.id,
                index: index.clone(),
            }
            .into()),
            _ => Err(ShapeViolation::UnsupportedCollection(entry.declared_type.clone()).into()),
        }
    }

    /// Items of a collection or entries of a dictionary, in order
    ///
    /// Plain objects and structs have none.
    pub(crate) fn live_entries(&self, node: NodeHandle) -> Result<Vec<(NodeIndex, Value)>> {
        let Value::Object(object) = self.value_of(node)? else {
            return Ok(Vec::new());
        };
        let instance = object.read();
        Ok(match instance.data() {
            InstanceData::Fields(_) => Vec::new(),
            InstanceData::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (NodeIndex::new(i), v.clone()))
                .collect(),
            InstanceData::Dictionary(entries) => entries
                .iter()
                .map(|(k, v)| (NodeIndex::Key(k.clone()), v.clone()))
                .collect(),
        })
    }

    /// Write the value of a member node into its parent, returning the old value
    ///
    /// Struct parents are written back through their own owner.
    pub(crate) fn write_member(&mut self, member: NodeHandle, value: Value) -> Result<Value> {
        let (parent, name) = {
            let data = self.member(member)?;
            (data.parent, data.name.clone())
        };
        let parent_entry = self.entry(parent)?;
        let parent_id = parent_entry.id;
        let source = match &parent_entry.data {
            NodeData::Object(object) => object.source.clone(),
            NodeData::Member(_) => {
                return Err(ConsistencyError::new("object parent", "member parent").into())
            }
        };
        match source {
            ObjectSource::Instance(weak) => {
                let object = weak.upgrade().ok_or(GraphError::ObjectDropped(parent_id))?;
                let previous = object.write().set_field(&name, value)?;
                Ok(previous)
            }
            ObjectSource::Boxed(owner) => {
                let Value::Struct(mut boxed) = self.value_of(parent)? else {
                    return Err(ConsistencyError::new(
                        "struct value behind boxed node",
                        "non-struct value",
                    )
                    .into());
                };
                let previous = boxed.set_field(&name, value)?;
                self.write_boxed(parent, owner, Value::Struct(boxed))?;
                Ok(previous)
            }
        }
    }

    /// Store a modified struct back into the owner of a boxed node
    fn write_boxed(&mut self, node: NodeHandle, owner: BoxOwner, value: Value) -> Result<()> {
        match owner {
            BoxOwner::Member(member) => self.write_member(member, value).map(drop),
            BoxOwner::Item { node: holder, index } => {
                self.write_item(holder, &index, value).map(drop)
            }
            BoxOwner::Detached(_) => {
                let Value::Struct(value) = value else {
                    return Err(ConsistencyError::new("struct value", "non-struct value").into());
                };
                self.object_mut(node)?.source = ObjectSource::Boxed(BoxOwner::Detached(value));
                Ok(())
            }
        }
    }

    /// Replace an existing item, returning the old value
    pub(crate) fn write_item(
        &mut self,
        node: NodeHandle,
        index: &NodeIndex,
        value: Value,
    ) -> Result<Value> {
        if index.is_empty() {
            return Err(AddressingError::EmptyIndexUpdate(self.entry(node)?.id).into());
        }
        let object = self.instance(node)?;
        let mut instance = object.write();
        match index {
            NodeIndex::Int(position) => Ok(instance.set_item(*position, value)?),
            NodeIndex::Key(key) => Ok(instance.set_entry(key, value)?),
            NodeIndex::Empty => Ok(Value::Null),
        }
    }

    /// Check whether `target` is a boxed node owned by `owner`
    pub(crate) fn is_owned_box(&self, target: NodeHandle, owner: &BoxOwner) -> bool {
        self.object(target)
            .ok()
            .and_then(ObjectNodeData::boxed_owner)
            .is_some_and(|o| o == owner)
    }

    /// Remove a node together with the members and boxed nodes it owns
    ///
    /// Instance targets are left alone; they are shared and owned by the
    /// identity map.
    pub(crate) fn free_subtree(&mut self, node: NodeHandle) -> usize {
        let Some(entry) = self.nodes.remove(node) else {
            return 0;
        };
        let mut freed = 1;
        match entry.data {
            NodeData::Object(object) => {
                for member in object.members.values() {
                    freed += self.free_subtree(*member);
                }
                if let Some(items) = object.items {
                    for (index, reference) in items.iter() {
                        let owner = BoxOwner::Item {
                            node,
                            index: index.clone(),
                        };
                        if let Some(target) = reference.target() {
                            if self.is_owned_box(target, &owner) {
                                freed += self.free_subtree(target);
                            }
                        }
                    }
                }
            }
            NodeData::Member(member) => {
                if let Some(target) = member.reference.and_then(|r| r.target()) {
                    if self.is_owned_box(target, &BoxOwner::Member(node)) {
                        freed += self.free_subtree(target);
                    }
                }
            }
        }
        freed
    }

    /// Release the previous target of a reference being replaced
    pub(crate) fn release_target(&mut self, previous: Option<NodeHandle>, owner: &BoxOwner) {
        if let Some(target) = previous {
            if self.is_owned_box(target, owner) {
                self.free_subtree(target);
            }
        }
    }
}

fn wrong_kind_object(entry: &NodeEntry) -> GraphError {
    AddressingError::WrongNodeKind {
        expected: NodeKind::Object,
        found: entry.kind(),
    }
    .into()
}
