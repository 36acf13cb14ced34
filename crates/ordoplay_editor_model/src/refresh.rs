// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reference reconciliation.
//!
//! After a mutation, the references of the affected subtree are compared with
//! the live values. Planning is read-only and produces a list of
//! [`ReconcileAction`]s; applying the plan creates the missing target nodes
//! and frees boxed nodes that lost their owner.

use crate::arena::NodeHandle;
use crate::builder::build;
use crate::error::{ConsistencyError, Result};
use crate::index::NodeIndex;
use crate::node::{BoxOwner, NodeData};
use crate::reference::{EnumerableReference, ObjectReference};
use crate::state::GraphState;
use ordoplay_editor_reflect::{ObjectRef, TypeDescriptorProvider, TypeName, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How far a refresh descends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RefreshScope {
    /// Reconcile the node and the boxed structs it owns
    #[default]
    Local,
    /// Also descend into every instance target that is kept
    Deep,
}

/// What a reference should point at after reconciliation
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    /// The object node of a shared instance
    Instance(ObjectRef),
    /// A fresh boxed node for a struct of this type
    Boxed(TypeName),
}

/// A single reconciliation step
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileAction {
    /// Point a member at a new target
    LinkMember {
        /// Member node
        member: NodeHandle,
        /// New target
        target: TargetSpec,
    },
    /// Member holds null; keep a reference with no target
    ClearMember {
        /// Member node
        member: NodeHandle,
    },
    /// Member holds a primitive now; drop its reference
    DetachMember {
        /// Member node
        member: NodeHandle,
    },
    /// Point an item at a new target
    LinkItem {
        /// Collection or dictionary node
        owner: NodeHandle,
        /// Item index
        index: NodeIndex,
        /// New target
        target: TargetSpec,
    },
    /// Item holds null or a primitive
    ClearItem {
        /// Collection or dictionary node
        owner: NodeHandle,
        /// Item index
        index: NodeIndex,
    },
    /// Item no longer exists
    DropItem {
        /// Collection or dictionary node
        owner: NodeHandle,
        /// Removed index
        index: NodeIndex,
    },
}

/// Planned reconciliation of a subtree
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPlan {
    root: NodeHandle,
    scope: RefreshScope,
    actions: Vec<ReconcileAction>,
}

impl RefreshPlan {
    /// Node the plan was computed from
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Scope the plan was computed with
    pub fn scope(&self) -> RefreshScope {
        self.scope
    }

    /// Planned actions in application order
    pub fn actions(&self) -> &[ReconcileAction] {
        &self.actions
    }

    /// Check whether the subtree is already consistent
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of planned actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

/// Compute the reconciliation plan for the subtree rooted at `root`
pub(crate) fn plan(state: &GraphState, root: NodeHandle, scope: RefreshScope) -> Result<RefreshPlan> {
    let mut planner = Planner {
        state,
        scope,
        visited: HashSet::new(),
        actions: Vec::new(),
    };
    planner.node(root)?;
    Ok(RefreshPlan {
        root,
        scope,
        actions: planner.actions,
    })
}

struct Planner<'a> {
    state: &'a GraphState,
    scope: RefreshScope,
    visited: HashSet<NodeHandle>,
    actions: Vec<ReconcileAction>,
}

impl Planner<'_> {
    fn node(&mut self, node: NodeHandle) -> Result<()> {
        if !self.visited.insert(node) {
            return Ok(());
        }
        let state = self.state;
        match &state.entry(node)?.data {
            NodeData::Member(_) => self.member(node),
            NodeData::Object(object) if object.items.is_some() => self.items(node),
            NodeData::Object(object) => {
                let members: Vec<_> = object.members.values().copied().collect();
                for member in members {
                    self.node(member)?;
                }
                Ok(())
            }
        }
    }

    fn reusable_box(&self, target: NodeHandle, owner: &BoxOwner, type_name: &TypeName) -> bool {
        self.state.is_owned_box(target, owner)
            && self
                .state
                .entry(target)
                .is_ok_and(|entry| &entry.descriptor.name == type_name)
    }

    fn kept_instance(&mut self, target: NodeHandle) -> Result<()> {
        match self.scope {
            RefreshScope::Deep => self.node(target),
            RefreshScope::Local => Ok(()),
        }
    }

    fn member(&mut self, member: NodeHandle) -> Result<()> {
        let current = self.state.member(member)?.reference;
        let current_target = current.and_then(|r| r.target());
        let owner = BoxOwner::Member(member);

        match self.state.value_of(member)? {
            Value::Object(object) => match (current_target, self.state.lookup_instance(&object)) {
                (Some(target), Some(existing)) if target == existing => self.kept_instance(target)?,
                _ => self.actions.push(ReconcileAction::LinkMember {
                    member,
                    target: TargetSpec::Instance(object),
                }),
            },
            Value::Struct(boxed) => match current_target {
                Some(target) if self.reusable_box(target, &owner, boxed.type_name()) => {
                    self.node(target)?;
                }
                _ => self.actions.push(ReconcileAction::LinkMember {
                    member,
                    target: TargetSpec::Boxed(boxed.type_name().clone()),
                }),
            },
            Value::Null => {
                // a primitive-kind member holding null stays primitive-kind
                if current_target.is_some() {
                    self.actions.push(ReconcileAction::ClearMember { member });
                }
            }
            _ => {
                if current.is_some() {
                    self.actions.push(ReconcileAction::DetachMember { member });
                }
            }
        }
        Ok(())
    }

    fn items(&mut self, owner: NodeHandle) -> Result<()> {
        let Some(reference) = self.state.object(owner)?.items.clone() else {
            return Ok(());
        };
        let live = self.state.live_entries(owner)?;

        for (index, value) in &live {
            let current = reference.get(index).and_then(ObjectReference::target);
            let box_owner = BoxOwner::Item {
                node: owner,
                index: index.clone(),
            };
            match value {
                Value::Object(object) => match (current, self.state.lookup_instance(object)) {
                    (Some(target), Some(existing)) if target == existing => {
                        self.kept_instance(target)?;
                    }
                    _ => self.actions.push(ReconcileAction::LinkItem {
                        owner,
                        index: index.clone(),
                        target: TargetSpec::Instance(object.clone()),
                    }),
                },
                Value::Struct(boxed) => match current {
                    Some(target) if self.reusable_box(target, &box_owner, boxed.type_name()) => {
                        self.node(target)?;
                    }
                    _ => self.actions.push(ReconcileAction::LinkItem {
                        owner,
                        index: index.clone(),
                        target: TargetSpec::Boxed(boxed.type_name().clone()),
                    }),
                },
                _ => {
                    if current.is_some() || !reference.has_index(index) {
                        self.actions.push(ReconcileAction::ClearItem {
                            owner,
                            index: index.clone(),
                        });
                    }
                }
            }
        }

        for index in reference.indices() {
            if !live.iter().any(|(live_index, _)| live_index == index) {
                self.actions.push(ReconcileAction::DropItem {
                    owner,
                    index: index.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Apply planned actions, returning how many were applied
///
/// Each action builds its target in its own step, so a failing action leaves
/// the ones before it applied and no dangling handles behind.
pub(crate) fn apply(
    state: &mut GraphState,
    provider: &dyn TypeDescriptorProvider,
    actions: &[ReconcileAction],
) -> Result<usize> {
    let mut touched = Vec::new();
    for action in actions {
        tracing::trace!("Reconciling {:?}", action);
        match action {
            ReconcileAction::LinkMember { member, target } => {
                state.member(*member)?;
                let owner = BoxOwner::Member(*member);
                let node = build(state, provider, |b| b.target_node(target, owner.clone()))?;
                let previous = state
                    .member_mut(*member)?
                    .reference
                    .replace(ObjectReference::new(Some(node)));
                release(state, previous, Some(node), &owner);
            }
            ReconcileAction::ClearMember { member } => {
                let previous = state
                    .member_mut(*member)?
                    .reference
                    .replace(ObjectReference::default());
                release(state, previous, None, &BoxOwner::Member(*member));
            }
            ReconcileAction::DetachMember { member } => {
                let previous = state.member_mut(*member)?.reference.take();
                release(state, previous, None, &BoxOwner::Member(*member));
            }
            ReconcileAction::LinkItem { owner, index, target } => {
                let box_owner = BoxOwner::Item {
                    node: *owner,
                    index: index.clone(),
                };
                let node = build(state, provider, |b| b.target_node(target, box_owner.clone()))?;
                let previous = item_references(state, *owner)?
                    .set(index.clone(), ObjectReference::new(Some(node)));
                release(state, previous, Some(node), &box_owner);
                touched.push(*owner);
            }
            ReconcileAction::ClearItem { owner, index } => {
                let previous = item_references(state, *owner)?.set(index.clone(), ObjectReference::default());
                let box_owner = BoxOwner::Item {
                    node: *owner,
                    index: index.clone(),
                };
                release(state, previous, None, &box_owner);
                touched.push(*owner);
            }
            ReconcileAction::DropItem { owner, index } => {
                let previous = item_references(state, *owner)?.remove(index);
                let box_owner = BoxOwner::Item {
                    node: *owner,
                    index: index.clone(),
                };
                release(state, previous, None, &box_owner);
                touched.push(*owner);
            }
        }
    }

    touched.sort();
    touched.dedup();
    for owner in touched {
        let order: Vec<NodeIndex> = state
            .live_entries(owner)?
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        item_references(state, owner)?.reorder(&order);
    }
    if !actions.is_empty() {
        tracing::debug!("Applied {} reconcile action(s)", actions.len());
    }
    Ok(actions.len())
}

fn item_references(
    state: &mut GraphState,
    owner: NodeHandle,
) -> Result<&mut EnumerableReference> {
    state.object_mut(owner)?.items.as_mut().ok_or_else(|| {
        ConsistencyError::new("collection node with item references", "node without items").into()
    })
}

fn release(
    state: &mut GraphState,
    previous: Option<ObjectReference>,
    kept: Option<NodeHandle>,
    owner: &BoxOwner,
) {
    let previous = previous.and_then(|r| r.target());
    if previous != kept {
        state.release_target(previous, owner);
    }
}
