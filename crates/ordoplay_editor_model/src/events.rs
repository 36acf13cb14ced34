// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notifications.
//!
//! Every mutation raises a "changing" notification before the data is touched
//! and a "changed" notification after the mutation and the reference refresh
//! completed. Member updates use the value family; collection and dictionary
//! operations use the item family.

use crate::arena::NodeHandle;
use crate::container::NodeContainer;
use crate::index::NodeIndex;
use ordoplay_editor_reflect::Value;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// What a mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// A member value was replaced
    ValueChange,
    /// An item was inserted; the old value is null
    CollectionAdd,
    /// An item was removed; the new value is null
    CollectionRemove,
    /// An item was replaced
    CollectionUpdate,
}

impl ChangeKind {
    /// Check whether the change belongs to the item family
    pub fn is_item_change(&self) -> bool {
        !matches!(self, Self::ValueChange)
    }
}

/// When a notification fires relative to the mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangePhase {
    /// Before the data is mutated
    Changing,
    /// After the mutation and the reference refresh
    Changed,
}

/// A single change, as seen by handlers
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Node that was mutated
    pub node: NodeHandle,
    /// Item index; empty for member updates
    pub index: NodeIndex,
    /// Kind of change
    pub kind: ChangeKind,
    /// Value before the change
    pub old_value: Value,
    /// Value after the change
    pub new_value: Value,
}

impl ChangeEvent {
    /// Create an event
    pub fn new(
        node: NodeHandle,
        index: NodeIndex,
        kind: ChangeKind,
        old_value: Value,
        new_value: Value,
    ) -> Self {
        Self {
            node,
            index,
            kind,
            old_value,
            new_value,
        }
    }
}

/// Receives change notifications
///
/// Handlers run with the container lock held, so they may query or even
/// mutate the container. Unhandled notifications default to no-ops.
pub trait NodeChangeHandler: Send + Sync {
    /// A member value is about to change
    fn value_changing(&self, _container: &NodeContainer, _event: &ChangeEvent) {}

    /// A member value changed
    fn value_changed(&self, _container: &NodeContainer, _event: &ChangeEvent) {}

    /// An item is about to be added, removed or replaced
    fn item_changing(&self, _container: &NodeContainer, _event: &ChangeEvent) {}

    /// An item was added, removed or replaced
    fn item_changed(&self, _container: &NodeContainer, _event: &ChangeEvent) {}
}

/// Identifies a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub(crate) struct Subscription {
    id: SubscriptionId,
    node: Option<NodeHandle>,
    handler: Arc<dyn NodeChangeHandler>,
}

impl NodeContainer {
    /// Receive notifications for every node of the container
    pub fn subscribe(&self, handler: Arc<dyn NodeChangeHandler>) -> SubscriptionId {
        self.add_subscription(None, handler)
    }

    /// Receive notifications for a single node
    pub fn subscribe_node(&self, node: NodeHandle, handler: Arc<dyn NodeChangeHandler>) -> SubscriptionId {
        self.add_subscription(Some(node), handler)
    }

    /// Stop a subscription; returns whether it existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    fn add_subscription(&self, node: Option<NodeHandle>, handler: Arc<dyn NodeChangeHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription { id, node, handler });
        id
    }

    /// Notify handlers; the subscription list is snapshotted so handlers may
    /// subscribe or unsubscribe while being notified
    pub(crate) fn dispatch(&self, phase: ChangePhase, event: &ChangeEvent) {
        let handlers: Vec<Arc<dyn NodeChangeHandler>> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.node.map_or(true, |node| node == event.node))
            .map(|s| Arc::clone(&s.handler))
            .collect();
        for handler in handlers {
            match (event.kind.is_item_change(), phase) {
                (false, ChangePhase::Changing) => handler.value_changing(self, event),
                (false, ChangePhase::Changed) => handler.value_changed(self, event),
                (true, ChangePhase::Changing) => handler.item_changing(self, event),
                (true, ChangePhase::Changed) => handler.item_changed(self, event),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records every notification with its phase
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) events: Mutex<Vec<(ChangePhase, ChangeEvent)>>,
    }

    impl Recorder {
        pub(crate) fn take(&self) -> Vec<(ChangePhase, ChangeEvent)> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    impl NodeChangeHandler for Recorder {
        fn value_changing(&self, _: &NodeContainer, event: &ChangeEvent) {
            self.events.lock().push((ChangePhase::Changing, event.clone()));
        }

        fn value_changed(&self, _: &NodeContainer, event: &ChangeEvent) {
            self.events.lock().push((ChangePhase::Changed, event.clone()));
        }

        fn item_changing(&self, _: &NodeContainer, event: &ChangeEvent) {
            self.events.lock().push((ChangePhase::Changing, event.clone()));
        }

        fn item_changed(&self, _: &NodeContainer, event: &ChangeEvent) {
            self.events.lock().push((ChangePhase::Changed, event.clone()));
        }
    }

    #[test]
    fn test_item_kinds() {
        assert!(!ChangeKind::ValueChange.is_item_change());
        assert!(ChangeKind::CollectionAdd.is_item_change());
        assert!(ChangeKind::CollectionRemove.is_item_change());
        assert!(ChangeKind::CollectionUpdate.is_item_change());
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let container = crate::test_support::container();
        let instance = crate::test_support::simple_class(1, None);
        let root = container
            .get_or_create_node(&instance.clone().into())
            .unwrap();
        let member = container.member(root, "Member1").unwrap();
        let recorder = Arc::new(Recorder::default());
        let id = container.subscribe(recorder.clone());

        container.update(member, 2).unwrap();
        assert_eq!(recorder.take().len(), 2);

        assert!(container.unsubscribe(id));
        assert!(!container.unsubscribe(id));
        container.update(member, 3).unwrap();
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_node_subscription_filters() {
        let container = crate::test_support::container();
        let instance = crate::test_support::simple_class(1, None);
        let root = container
            .get_or_create_node(&instance.clone().into())
            .unwrap();
        let member1 = container.member(root, "Member1").unwrap();
        let member2 = container.member(root, "Member2").unwrap();
        let recorder = Arc::new(Recorder::default());
        container.subscribe_node(member1, recorder.clone());

        container.update(member2, Value::Null).unwrap();
        assert!(recorder.take().is_empty());
        container.update(member1, 5).unwrap();
        let events = recorder.take();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|(_, e)| e.node == member1));
    }
}
