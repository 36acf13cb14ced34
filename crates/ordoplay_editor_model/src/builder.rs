// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph construction.
//!
//! A build step creates nodes depth-first from live values. Instances already
//! in the identity map, including ones still under construction higher up the
//! stack, are reused, which is what makes cyclic data terminate. A failed
//! step removes every node it created before the error is returned.

use crate::arena::NodeHandle;
use crate::error::{ConsistencyError, Result, ShapeViolation};
use crate::node::{BoxOwner, NodeData, NodeEntry, ObjectSource};
use crate::reference::{EnumerableReference, ObjectReference};
use crate::refresh::TargetSpec;
use crate::state::{GraphState, IdentityEntry};
use ordoplay_editor_reflect::{
    MemberDescriptor, ObjectRef, TypeDescriptor, TypeDescriptorProvider, TypeName, TypeShape, Value,
};

/// Whether a member holding `value` is a reference holder
pub(crate) fn holds_reference(value: &Value, declared: &TypeDescriptor) -> bool {
    match value {
        Value::Object(_) | Value::Struct(_) => true,
        Value::Null => !declared.is_primitive(),
        _ => false,
    }
}

/// Run a construction step, rolling back everything it created on failure
pub(crate) fn build<R>(
    state: &mut GraphState,
    provider: &dyn TypeDescriptorProvider,
    step: impl FnOnce(&mut Builder<'_>) -> Result<R>,
) -> Result<R> {
    let mut builder = Builder {
        state,
        provider,
        created: Vec::new(),
    };
    match step(&mut builder) {
        Ok(result) => {
            if !builder.created.is_empty() {
                tracing::debug!("Built {} node(s)", builder.created.len());
            }
            Ok(result)
        }
        Err(e) => {
            let removed = builder.rollback();
            tracing::warn!("Graph construction failed, removed {} partial node(s): {}", removed, e);
            Err(e)
        }
    }
}

pub(crate) struct Builder<'a> {
    state: &'a mut GraphState,
    provider: &'a dyn TypeDescriptorProvider,
    created: Vec<NodeHandle>,
}

impl Builder<'_> {
    /// Object node of an instance, created with its whole subgraph if needed
    pub(crate) fn instance_node(&mut self, object: &ObjectRef) -> Result<NodeHandle> {
        if let Some(existing) = self.state.lookup_instance(object) {
            return Ok(existing);
        }

        let type_name = object.type_name();
        let descriptor = self.provider.require(&type_name)?.clone();
        if !matches!(
            descriptor.shape,
            TypeShape::Object { .. } | TypeShape::Collection { .. } | TypeShape::Dictionary { .. }
        ) {
            return Err(ConsistencyError::new(
                "reference type behind a shared instance",
                format!("instance of {type_name}"),
            )
            .into());
        }

        let weak = object.downgrade();
        let node = self
            .state
            .nodes
            .insert(NodeEntry::object(descriptor.clone(), ObjectSource::Instance(weak.clone())));
        self.state
            .identity
            .insert(object.key(), IdentityEntry { object: weak, node });
        self.created.push(node);
        self.seal_after_populate(node, &descriptor)?;
        Ok(node)
    }

    /// Boxed node for a struct stored at `owner`
    pub(crate) fn boxed_node(&mut self, owner: BoxOwner, type_name: &TypeName) -> Result<NodeHandle> {
        let descriptor = self.provider.require(type_name)?.clone();
        if !descriptor.is_value_type() {
            return Err(ConsistencyError::new(
                "value type behind a boxed node",
                format!("type {type_name}"),
            )
            .into());
        }
        let node = self
            .state
            .nodes
            .insert(NodeEntry::object(descriptor.clone(), ObjectSource::Boxed(owner)));
        self.created.push(node);
        self.seal_after_populate(node, &descriptor)?;
        Ok(node)
    }

    /// Node for a planned reference target
    pub(crate) fn target_node(&mut self, target: &TargetSpec, owner: BoxOwner) -> Result<NodeHandle> {
        match target {
            TargetSpec::Instance(object) => self.instance_node(object),
            TargetSpec::Boxed(type_name) => self.boxed_node(owner, type_name),
        }
    }

    /// Target node for a value held by a reference; `None` for null and primitives
    pub(crate) fn resolve_target(&mut self, value: &Value, owner: BoxOwner) -> Result<Option<NodeHandle>> {
        match value {
            Value::Object(object) => self.instance_node(object).map(Some),
            Value::Struct(boxed) => self.boxed_node(owner, boxed.type_name()).map(Some),
            _ => Ok(None),
        }
    }

    /// Create a member node under `parent` and resolve its target
    pub(crate) fn member_node(&mut self, parent: NodeHandle, member: &MemberDescriptor) -> Result<NodeHandle> {
        let descriptor = self.provider.require(&member.type_name)?.clone();
        let parent_id = self.state.entry(parent)?.id;
        let node = self.state.nodes.insert(NodeEntry::member(
            member.type_name.clone(),
            descriptor.clone(),
            parent,
            member.name.clone(),
        ));
        self.created.push(node);
        self.state
            .object_mut(parent)?
            .add_member(parent_id, &member.name, node)?;

        let value = self.state.value_of(node)?;
        if holds_reference(&value, &descriptor) {
            let target = self.resolve_target(&value, BoxOwner::Member(node))?;
            self.state.member_mut(node)?.reference = Some(ObjectReference::new(target));
        }
        Ok(node)
    }

    fn seal_after_populate(&mut self, node: NodeHandle, descriptor: &TypeDescriptor) -> Result<()> {
        self.populate(node, descriptor)?;
        self.state.object_mut(node)?.sealed = true;
        Ok(())
    }

    fn populate(&mut self, node: NodeHandle, descriptor: &TypeDescriptor) -> Result<()> {
        match &descriptor.shape {
            TypeShape::Object { .. } | TypeShape::Struct { .. } => {
                for member in self.provider.members_of(&descriptor.name) {
                    self.member_node(node, &member)?;
                }
                Ok(())
            }
            TypeShape::Collection { element, indexable } => {
                if !indexable {
                    return Err(ShapeViolation::UnsupportedCollection(descriptor.name.clone()).into());
                }
                self.item_references(node, element)
            }
            TypeShape::Dictionary { key, value } => {
                if !self.provider.is_primitive(key) {
                    return Err(ShapeViolation::NonPrimitiveKey {
                        dictionary: descriptor.name.clone(),
                        key: key.clone(),
                    }
                    .into());
                }
                self.item_references(node, value)
            }
            TypeShape::Primitive | TypeShape::Any => Err(ConsistencyError::new(
                "object, struct, collection or dictionary",
                format!("type {}", descriptor.name),
            )
            .into()),
        }
    }

    /// Build the per-item references of a collection or dictionary node
    ///
    /// Primitive items are never decomposed, so those nodes get none.
    fn item_references(&mut self, node: NodeHandle, element: &TypeName) -> Result<()> {
        if self.provider.require(element)?.is_primitive() {
            return Ok(());
        }
        let mut reference = EnumerableReference::new(element.clone());
        for (index, value) in self.state.live_entries(node)? {
            let owner = BoxOwner::Item {
                node,
                index: index.clone(),
            };
            let target = self.resolve_target(&value, owner)?;
            reference.set(index, ObjectReference::new(target));
        }
        self.state.object_mut(node)?.items = Some(reference);
        Ok(())
    }

    fn rollback(&mut self) -> usize {
        let state = &mut *self.state;
        let mut removed = 0;
        for node in self.created.drain(..).rev() {
            let Some(entry) = state.nodes.remove(node) else {
                continue;
            };
            removed += 1;
            // detach from a parent that survives the rollback
            if let NodeData::Member(member) = entry.data {
                if let Some(NodeData::Object(parent)) =
                    state.nodes.get_mut(member.parent).map(|e| &mut e.data)
                {
                    if parent.members.get(&member.name) == Some(&node) {
                        parent.members.shift_remove(&member.name);
                    }
                }
            }
        }
        let nodes = &state.nodes;
        state.identity.retain(|_, entry| nodes.contains(entry.node));
        removed
    }
}
