// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mutations.
//!
//! Every mutation follows the same sequence under the container lock:
//! validate, raise "changing", mutate the live data, refresh the references of
//! the mutated node, raise "changed". Validation failures raise nothing.
//! When the refresh fails, the live data is restored and the error is
//! returned without a "changed" notification.

use crate::arena::NodeHandle;
use crate::builder::holds_reference;
use crate::config::MemberKindPolicy;
use crate::container::NodeContainer;
use crate::error::{AddressingError, GraphError, Result, ShapeViolation};
use crate::events::{ChangeEvent, ChangeKind, ChangePhase};
use crate::index::NodeIndex;
use crate::node::{NodeData, NodeKind};
use crate::refresh;
use crate::state::GraphState;
use ordoplay_editor_reflect::{ReflectError, TypeDescriptorProvider, TypeName, TypeShape, Value};

/// Item operation being validated
#[derive(Clone, Copy, PartialEq, Eq)]
enum ItemOp {
    Update,
    Add,
    Remove,
}

impl NodeContainer {
    /// Replace the value of a member node
    pub fn update(&self, node: NodeHandle, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let _serial = self.lock();
        let old_value = self.read(|state| self.validate_member_update(state, node, &value))?;

        let event = ChangeEvent::new(node, NodeIndex::Empty, ChangeKind::ValueChange, old_value, value);
        self.dispatch(ChangePhase::Changing, &event);
        self.write(|state, provider| {
            let previous = state.write_member(node, event.new_value.clone())?;
            self.refresh_or_restore(state, provider, node, |state| {
                state.write_member(node, previous).map(drop)
            })
        })?;
        self.dispatch(ChangePhase::Changed, &event);
        Ok(())
    }

    /// Replace a value addressed by node and index
    ///
    /// An empty index updates a member node. A non-empty index replaces an
    /// existing item of a collection or dictionary node.
    pub fn update_at(&self, node: NodeHandle, value: impl Into<Value>, index: &NodeIndex) -> Result<()> {
        if index.is_empty() {
            return self.update(node, value);
        }
        let value = value.into();
        let _serial = self.lock();
        let old_value = self.read(|state| self.validate_item(state, node, &value, index, ItemOp::Update))?;

        let event = ChangeEvent::new(node, index.clone(), ChangeKind::CollectionUpdate, old_value, value);
        self.dispatch(ChangePhase::Changing, &event);
        self.write(|state, provider| {
            let previous = state.write_item(node, index, event.new_value.clone())?;
            self.refresh_or_restore(state, provider, node, |state| {
                state.write_item(node, index, previous).map(drop)
            })
        })?;
        self.dispatch(ChangePhase::Changed, &event);
        Ok(())
    }

    /// Insert an item into a collection node, or a new entry into a dictionary node
    ///
    /// A collection index may equal the current length to append.
    pub fn add_item(&self, node: NodeHandle, value: impl Into<Value>, index: &NodeIndex) -> Result<()> {
        let value = value.into();
        let _serial = self.lock();
        self.read(|state| self.validate_item(state, node, &value, index, ItemOp::Add))?;

        let event = ChangeEvent::new(node, index.clone(), ChangeKind::CollectionAdd, Value::Null, value);
        self.dispatch(ChangePhase::Changing, &event);
        self.write(|state, provider| {
            let object = state.instance(node)?;
            {
                let mut instance = object.write();
                match index {
                    NodeIndex::Int(position) => instance.insert_item(*position, event.new_value.clone())?,
                    NodeIndex::Key(key) => instance.insert_entry(key.clone(), event.new_value.clone())?,
                    NodeIndex::Empty => return Err(AddressingError::EmptyIndexUpdate(state.entry(node)?.id).into()),
                }
            }
            self.refresh_or_restore(state, provider, node, |_| {
                let mut instance = object.write();
                match index {
                    NodeIndex::Int(position) => instance.remove_item(*position)?,
                    NodeIndex::Key(key) => instance.remove_entry(key)?,
                    NodeIndex::Empty => Value::Null,
                };
                Ok(())
            })
        })?;
        self.dispatch(ChangePhase::Changed, &event);
        Ok(())
    }

    /// Append an item to a collection node
    pub fn push_item(&self, node: NodeHandle, value: impl Into<Value>) -> Result<()> {
        let len = self.indices(node)?.len();
        self.add_item(node, value, &NodeIndex::new(len))
    }

    /// Remove an item from a collection node or an entry from a dictionary node
    pub fn remove_item(&self, node: NodeHandle, index: &NodeIndex) -> Result<()> {
        let _serial = self.lock();
        let old_value = self.read(|state| self.validate_item(state, node, &Value::Null, index, ItemOp::Remove))?;

        let event = ChangeEvent::new(node, index.clone(), ChangeKind::CollectionRemove, old_value, Value::Null);
        self.dispatch(ChangePhase::Changing, &event);
        self.write(|state, provider| {
            let object = state.instance(node)?;
            {
                let mut instance = object.write();
                match index {
                    NodeIndex::Int(position) => instance.remove_item(*position)?,
                    NodeIndex::Key(key) => instance.remove_entry(key)?,
                    NodeIndex::Empty => return Err(AddressingError::EmptyIndexUpdate(state.entry(node)?.id).into()),
                };
            }
            self.refresh_or_restore(state, provider, node, |_| {
                let mut instance = object.write();
                match index {
                    NodeIndex::Int(position) => instance.insert_item(*position, event.old_value.clone())?,
                    NodeIndex::Key(key) => instance.insert_entry(key.clone(), event.old_value.clone())?,
                    NodeIndex::Empty => {}
                }
                Ok(())
            })
        })?;
        self.dispatch(ChangePhase::Changed, &event);
        Ok(())
    }

    fn refresh_after_update(
        &self,
        state: &mut GraphState,
        provider: &dyn TypeDescriptorProvider,
        node: NodeHandle,
    ) -> Result<()> {
        let plan = refresh::plan(state, node, self.config().update_refresh_scope)?;
        refresh::apply(state, provider, plan.actions())?;
        Ok(())
    }

    /// Refresh after a raw write; on failure undo the write and resync the references
    fn refresh_or_restore(
        &self,
        state: &mut GraphState,
        provider: &dyn TypeDescriptorProvider,
        node: NodeHandle,
        undo: impl FnOnce(&mut GraphState) -> Result<()>,
    ) -> Result<()> {
        let Err(error) = self.refresh_after_update(state, provider, node) else {
            return Ok(());
        };
        tracing::warn!("Refresh of node {} failed, restoring the previous value: {}", node, error);
        undo(state)?;
        self.refresh_after_update(state, provider, node)?;
        Err(error)
    }

    /// Check a member update and return the current value
    fn validate_member_update(&self, state: &GraphState, node: NodeHandle, value: &Value) -> Result<Value> {
        let entry = state.entry(node)?;
        let member = match &entry.data {
            NodeData::Member(member) => member,
            NodeData::Object(_) => return Err(AddressingError::EmptyIndexUpdate(entry.id).into()),
        };
        if !self.provider().is_assignable(&entry.declared_type, value) {
            return Err(type_mismatch(&entry.declared_type, value));
        }
        if self.config().member_kind_policy == MemberKindPolicy::Fixed && !value.is_null() {
            let was_reference = member.reference.is_some();
            if holds_reference(value, &entry.descriptor) != was_reference {
                return Err(GraphError::MemberKindChanged {
                    member: member.name.clone(),
                    was_reference,
                });
            }
        }
        state.value_of(node)
    }

    /// Check an item operation and return the current item value
    ///
    /// Adds return null since the index does not exist yet.
    fn validate_item(
        &self,
        state: &GraphState,
        node: NodeHandle,
        value: &Value,
        index: &NodeIndex,
        op: ItemOp,
    ) -> Result<Value> {
        let entry = state.entry(node)?;
        if entry.kind() != NodeKind::Object {
            return Err(match entry.kind() {
                NodeKind::Member => AddressingError::WrongNodeKind {
                    expected: NodeKind::Object,
                    found: NodeKind::Member,
                }
                .into(),
                _ => ShapeViolation::UnsupportedCollection(entry.descriptor.name.clone()).into(),
            });
        }
        if index.is_empty() {
            return Err(AddressingError::EmptyIndexUpdate(entry.id).into());
        }

        let item_type = match (&entry.descriptor.shape, index) {
            (TypeShape::Collection { element, .. }, NodeIndex::Int(_)) => element,
            (TypeShape::Dictionary { key, value }, NodeIndex::Key(k)) => {
                if !self.provider().is_assignable(key, &Value::from(k.clone())) {
                    return Err(ReflectError::InvalidKey(k.type_name()).into());
                }
                value
            }
            _ => return Err(ShapeViolation::UnsupportedCollection(entry.descriptor.name.clone()).into()),
        };
        if op != ItemOp::Remove && !self.provider().is_assignable(item_type, value) {
            return Err(type_mismatch(item_type, value));
        }

        match op {
            ItemOp::Update | ItemOp::Remove => state.value_at(node, index),
            ItemOp::Add => {
                let object = state.instance(node)?;
                let instance = object.read();
                match index {
                    NodeIndex::Int(position) if *position > instance.len() => {
                        Err(ReflectError::IndexOutOfRange {
                            type_name: entry.descriptor.name.clone(),
                            index: *position,
                            len: instance.len(),
                        }
                        .into())
                    }
                    NodeIndex::Key(key) if instance.entry(key).is_ok() => Err(ReflectError::DuplicateKey {
                        type_name: entry.descriptor.name.clone(),
                        key: key.clone(),
                    }
                    .into()),
                    _ => Ok(Value::Null),
                }
            }
        }
    }
}

fn type_mismatch(expected: &TypeName, value: &Value) -> GraphError {
    ReflectError::TypeMismatch {
        expected: expected.clone(),
        found: value.type_name().unwrap_or_else(|| TypeName::new("null")),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::events::tests::Recorder;
    use crate::node::BoxOwner;
    use crate::test_support::*;
    use ordoplay_editor_reflect::{Key, ObjectRef, StructValue};
    use std::sync::Arc;

    #[test]
    fn test_member_update_events_order() {
        let container = container();
        let instance = simple_class(1, None);
        let root = container.get_or_create_node(&instance.clone().into()).unwrap();
        let member = container.member(root, "Member1").unwrap();
        let recorder = Arc::new(Recorder::default());
        container.subscribe(recorder.clone());

        container.update(member, 42).unwrap();
        let events = recorder.take();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, ChangePhase::Changing);
        assert_eq!(events[1].0, ChangePhase::Changed);
        assert_eq!(events[0].1.kind, ChangeKind::ValueChange);
        assert_eq!(events[0].1.old_value, Value::Int(1));
        assert_eq!(events[0].1.new_value, Value::Int(42));
        assert_eq!(instance.field("Member1").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_changing_sees_old_value_changed_sees_new() {
        struct Check {
            seen: parking_lot::Mutex<Vec<Value>>,
        }
        impl crate::events::NodeChangeHandler for Check {
            fn value_changing(&self, container: &NodeContainer, event: &ChangeEvent) {
                self.seen.lock().push(container.retrieve(event.node).unwrap());
            }
            fn value_changed(&self, container: &NodeContainer, event: &ChangeEvent) {
                self.seen.lock().push(container.retrieve(event.node).unwrap());
            }
        }

        let container = container();
        let instance = simple_class(1, None);
        let root = container.get_or_create_node(&instance.clone().into()).unwrap();
        let member = container.member(root, "Member1").unwrap();
        let check = Arc::new(Check {
            seen: parking_lot::Mutex::new(Vec::new()),
        });
        container.subscribe(check.clone());
        container.update(member, 9).unwrap();
        assert_eq!(*check.seen.lock(), vec![Value::Int(1), Value::Int(9)]);
    }

    #[test]
    fn test_update_object_node_rejected() {
        let container = container();
        let instance = simple_class(1, None);
        let root = container.get_or_create_node(&instance.clone().into()).unwrap();
        let recorder = Arc::new(Recorder::default());
        container.subscribe(recorder.clone());
        assert!(matches!(
            container.update(root, 3),
            Err(GraphError::Addressing(AddressingError::EmptyIndexUpdate(_)))
        ));
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_update_type_mismatch_rejected() {
        let container = container();
        let instance = simple_class(1, None);
        let root = container.get_or_create_node(&instance.clone().into()).unwrap();
        let member = container.member(root, "Member1").unwrap();
        assert!(matches!(
            container.update(member, "text"),
            Err(GraphError::Reflect(ReflectError::TypeMismatch { .. }))
        ));
        assert_eq!(container.retrieve(member).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_reference_member_retargets() {
        let container = container();
        let instance = simple_class(1, None);
        let root = container.get_or_create_node(&instance.clone().into()).unwrap();
        let member2 = container.member(root, "Member2").unwrap();

        let first = simple_class(2, None);
        container.update(member2, first.clone()).unwrap();
        let first_node = container.target(member2).unwrap();
        assert!(first_node.is_some());
        assert_eq!(first_node, container.get_node(&first.into()));

        let second = simple_class(3, None);
        container.update(member2, second.clone()).unwrap();
        assert_eq!(container.target(member2).unwrap(), container.get_node(&second.into()));

        container.update(member2, Value::Null).unwrap();
        assert_eq!(container.target(member2).unwrap(), None);
        assert!(container.node(member2).unwrap().is_reference);
        // member node identity is preserved across updates
        assert_eq!(container.member(root, "Member2").unwrap(), member2);
    }

    #[test]
    fn test_struct_member_update_keeps_boxed_node() {
        let container = container();
        let instance = object_with_struct("a", None);
        let root = container.get_or_create_node(&instance.clone().into()).unwrap();
        let member = container.member(root, "Member1").unwrap();
        let boxed = container.target(member).unwrap().unwrap();
        let inner = container.member(boxed, "Member1").unwrap();

        let replacement = StructValue::new("Struct")
            .with_field("Member1", "b")
            .with_field("Member2", Value::Null);
        container.update(member, replacement).unwrap();
        assert_eq!(container.target(member).unwrap(), Some(boxed));
        assert_eq!(container.member(boxed, "Member1").unwrap(), inner);
        assert_eq!(container.retrieve(inner).unwrap(), Value::from("b"));
    }

    #[test]
    fn test_boxed_member_write_back() {
        let container = container();
        let instance = object_with_struct("a", None);
        let root = container.get_or_create_node(&instance.clone().into()).unwrap();
        let boxed = container.target(container.member(root, "Member1").unwrap()).unwrap().unwrap();
        let inner = container.member(boxed, "Member1").unwrap();
        let inner_ref = container.member(boxed, "Member2").unwrap();

        container.update(inner, "written").unwrap();
        let stored = instance.field("Member1").unwrap();
        assert_eq!(stored.as_struct().unwrap().field("Member1").unwrap(), &Value::from("written"));

        // a reference inside the struct resolves through the owner chain
        let child = simple_class(5, None);
        container.update(inner_ref, child.clone()).unwrap();
        assert_eq!(container.target(inner_ref).unwrap(), container.get_node(&child.into()));
    }

    #[test]
    fn test_list_item_update_add_remove() {
        let container = container();
        let list = ObjectRef::list("List<SimpleClass>", [simple_class(1, None).into()]);
        let root = container.get_or_create_node(&list.clone().into()).unwrap();
        let recorder = Arc::new(Recorder::default());
        container.subscribe(recorder.clone());

        let added = simple_class(2, None);
        container.add_item(root, added.clone(), &NodeIndex::new(0)).unwrap();
        let events = recorder.take();
        assert_eq!(events[0].1.kind, ChangeKind::CollectionAdd);
        assert_eq!(events[0].1.old_value, Value::Null);
        assert_eq!(events[1].1.new_value, Value::Object(added.clone()));
        assert_eq!(
            container.indexed_target(root, &NodeIndex::new(0)).unwrap(),
            container.get_node(&added.clone().into())
        );
        assert_eq!(container.item_references(root).unwrap().unwrap().len(), 2);

        let replaced = simple_class(3, None);
        container.update_at(root, replaced.clone(), &NodeIndex::new(1)).unwrap();
        let events = recorder.take();
        assert_eq!(events[0].1.kind, ChangeKind::CollectionUpdate);
        assert_eq!(
            container.indexed_target(root, &NodeIndex::new(1)).unwrap(),
            container.get_node(&replaced.into())
        );

        container.remove_item(root, &NodeIndex::new(0)).unwrap();
        let events = recorder.take();
        assert_eq!(events[0].1.kind, ChangeKind::CollectionRemove);
        assert_eq!(events[0].1.old_value, Value::Object(added));
        assert_eq!(events[0].1.new_value, Value::Null);
        assert_eq!(list.len(), 1);
        assert_eq!(container.item_references(root).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_struct_list_remove_reuses_boxed_slots() {
        let container = container();
        let list = ObjectRef::list(
            "List<Struct>",
            [
                StructValue::new("Struct").with_field("Member1", "a").with_field("Member2", Value::Null).into(),
                StructValue::new("Struct").with_field("Member1", "b").with_field("Member2", Value::Null).into(),
            ],
        );
        let root = container.get_or_create_node(&list.clone().into()).unwrap();
        let first = container.indexed_target(root, &NodeIndex::new(0)).unwrap().unwrap();
        let second = container.indexed_target(root, &NodeIndex::new(1)).unwrap().unwrap();
        let before = container.len();

        container.remove_item(root, &NodeIndex::new(0)).unwrap();
        assert_eq!(container.indexed_target(root, &NodeIndex::new(0)).unwrap(), Some(first));
        assert!(!container.contains(second));
        let inner = container.member(first, "Member1").unwrap();
        assert_eq!(container.retrieve(inner).unwrap(), Value::from("b"));
        // the boxed node and its two members were freed
        assert_eq!(container.len(), before - 3);
        assert_eq!(
            container.box_owner(first).unwrap(),
            Some(BoxOwner::Item {
                node: root,
                index: NodeIndex::new(0)
            })
        );
    }

    #[test]
    fn test_struct_list_item_member_write_back() {
        let container = container();
        let list = ObjectRef::list(
            "List<Struct>",
            [StructValue::new("Struct").with_field("Member1", "a").with_field("Member2", Value::Null).into()],
        );
        let root = container.get_or_create_node(&list.clone().into()).unwrap();
        let boxed = container.indexed_target(root, &NodeIndex::new(0)).unwrap().unwrap();
        let inner = container.member(boxed, "Member1").unwrap();
        container.update(inner, "z").unwrap();
        let item = list.item(0).unwrap();
        assert_eq!(item.as_struct().unwrap().field("Member1").unwrap(), &Value::from("z"));
    }

    #[test]
    fn test_dictionary_operations() {
        let container = container();
        let dict = ObjectRef::dictionary("Dictionary<string,SimpleClass>", Vec::new());
        let root = container.get_or_create_node(&dict.clone().into()).unwrap();
        let value = simple_class(1, None);

        container.add_item(root, value.clone(), &NodeIndex::key("a")).unwrap();
        assert_eq!(
            container.indexed_target(root, &NodeIndex::key("a")).unwrap(),
            container.get_node(&value.clone().into())
        );
        assert!(matches!(
            container.add_item(root, Value::Null, &NodeIndex::key("a")),
            Err(GraphError::Reflect(ReflectError::DuplicateKey { .. }))
        ));
        assert!(matches!(
            container.add_item(root, Value::Null, &NodeIndex::new(0)),
            Err(GraphError::Shape(ShapeViolation::UnsupportedCollection(_)))
        ));

        container.update_at(root, Value::Null, &NodeIndex::key("a")).unwrap();
        assert_eq!(container.indexed_target(root, &NodeIndex::key("a")).unwrap(), None);
        container.remove_item(root, &NodeIndex::key("a")).unwrap();
        assert!(dict.is_empty());
        assert!(container.item_references(root).unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_update_at_on_plain_object_is_unsupported() {
        let container = container();
        let instance = simple_class(1, None);
        let root = container.get_or_create_node(&instance.clone().into()).unwrap();
        assert!(matches!(
            container.update_at(root, 1, &NodeIndex::new(0)),
            Err(GraphError::Shape(ShapeViolation::UnsupportedCollection(_)))
        ));
    }

    #[test]
    fn test_primitive_list_operations() {
        let container = container();
        let list = ObjectRef::list("List<string>", ["a".into()]);
        let root = container.get_or_create_node(&list.clone().into()).unwrap();
        container.push_item(root, "b").unwrap();
        container.update_at(root, "c", &NodeIndex::new(0)).unwrap();
        assert_eq!(list.item(0).unwrap(), Value::from("c"));
        assert_eq!(list.item(1).unwrap(), Value::from("b"));
        assert_eq!(container.item_references(root).unwrap(), None);
        assert!(container.add_item(root, "x", &NodeIndex::new(5)).is_err());
    }

    #[test]
    fn test_dynamic_member_kind_flips() {
        let container = container();
        let holder = ObjectRef::object("AnyHolder", [("Value", Value::Int(1))]);
        let root = container.get_or_create_node(&holder.clone().into()).unwrap();
        let member = container.member(root, "Value").unwrap();
        assert!(!container.node(member).unwrap().is_reference);

        let object = simple_class(1, None);
        container.update(member, object.clone()).unwrap();
        assert!(container.node(member).unwrap().is_reference);
        assert_eq!(container.target(member).unwrap(), container.get_node(&object.into()));

        container.update(member, 5).unwrap();
        assert!(!container.node(member).unwrap().is_reference);
        assert_eq!(container.target_reference(member).unwrap(), None);
    }

    #[test]
    fn test_fixed_member_kind_rejects_flips() {
        let config = ModelConfig::default().with_member_kind_policy(MemberKindPolicy::Fixed);
        let container = NodeContainer::with_config(Arc::new(registry()), config);
        let holder = ObjectRef::object("AnyHolder", [("Value", Value::Int(1))]);
        let root = container.get_or_create_node(&holder.clone().into()).unwrap();
        let member = container.member(root, "Value").unwrap();
        let recorder = Arc::new(Recorder::default());
        container.subscribe(recorder.clone());

        assert!(matches!(
            container.update(member, simple_class(1, None)),
            Err(GraphError::MemberKindChanged { was_reference: false, .. })
        ));
        assert!(recorder.take().is_empty());
        container.update(member, 2).unwrap();
        // null fits either kind
        container.update(member, Value::Null).unwrap();
    }

    #[test]
    fn test_item_update_events_order() {
        let container = container();
        let list = ObjectRef::list("List<string>", ["a".into(), "b".into()]);
        let root = container.get_or_create_node(&list.clone().into()).unwrap();
        let recorder = Arc::new(Recorder::default());
        container.subscribe(recorder.clone());

        container.update_at(root, "z", &NodeIndex::new(1)).unwrap();
        let events = recorder.take();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, ChangePhase::Changing);
        assert_eq!(events[0].1.kind, ChangeKind::CollectionUpdate);
        assert_eq!(events[0].1.node, root);
        assert_eq!(events[0].1.index, NodeIndex::new(1));
        assert_eq!(events[0].1.old_value, Value::from("b"));
        assert_eq!(events[1].0, ChangePhase::Changed);
        assert_eq!(events[1].1.kind, ChangeKind::CollectionUpdate);
        assert_eq!(events[1].1.index, NodeIndex::new(1));
        assert_eq!(events[1].1.new_value, Value::from("z"));
        assert_eq!(list.item(1).unwrap(), Value::from("z"));
    }

    #[test]
    fn test_failed_member_refresh_restores_value() {
        let container = container();
        let original = simple_class(1, None);
        let holder = ObjectRef::object("AnyHolder", [("Value", original.clone().into())]);
        let root = container.get_or_create_node(&holder.clone().into()).unwrap();
        let member = container.member(root, "Value").unwrap();
        let reference = container.target_reference(member).unwrap();
        let target = container.target(member).unwrap();
        let len = container.len();
        let recorder = Arc::new(Recorder::default());
        container.subscribe(recorder.clone());

        let bad = ObjectRef::dictionary("Dictionary<SimpleClass,int>", Vec::<(Key, Value)>::new());
        assert!(matches!(
            container.update(member, bad.clone()),
            Err(GraphError::Shape(ShapeViolation::NonPrimitiveKey { .. }))
        ));
        assert_eq!(holder.field("Value").unwrap(), Value::Object(original.clone()));
        assert_eq!(container.target_reference(member).unwrap(), reference);
        assert_eq!(container.target(member).unwrap(), target);
        assert_eq!(container.get_node(&bad.into()), None);
        assert_eq!(container.len(), len);
        assert!(container.plan_refresh(root, refresh::RefreshScope::Deep).unwrap().is_empty());

        // "changing" went out before the write, nothing follows it
        let events = recorder.take();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, ChangePhase::Changing);
    }

    #[test]
    fn test_failed_item_refresh_restores_collection() {
        let container = container();
        let first = simple_class(1, None);
        let list = ObjectRef::list("List<object>", [first.clone().into()]);
        let root = container.get_or_create_node(&list.clone().into()).unwrap();
        let len = container.len();

        let bad = ObjectRef::dictionary("Dictionary<SimpleClass,int>", Vec::<(Key, Value)>::new());
        assert!(matches!(
            container.push_item(root, bad.clone()),
            Err(GraphError::Shape(ShapeViolation::NonPrimitiveKey { .. }))
        ));
        assert_eq!(list.len(), 1);
        assert!(matches!(
            container.update_at(root, bad, &NodeIndex::new(0)),
            Err(GraphError::Shape(ShapeViolation::NonPrimitiveKey { .. }))
        ));
        assert_eq!(list.item(0).unwrap(), Value::Object(first.clone()));
        assert_eq!(container.item_references(root).unwrap().unwrap().len(), 1);
        assert_eq!(
            container.indexed_target(root, &NodeIndex::new(0)).unwrap(),
            container.get_node(&first.into())
        );
        assert_eq!(container.len(), len);
    }
}
