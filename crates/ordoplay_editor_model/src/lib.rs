// SPDX-License-Identifier: MIT OR Apache-2.0
//! Object graph node model for `OrdoPlay` Editor.
//!
//! Given any object instance, this crate builds a navigable graph of nodes
//! mirroring the instance's members, collection items and dictionary entries.
//! It powers:
//! - Property inspection and editing with change notifications
//! - Reference tracking across shared and cyclic object graphs
//! - Stable path addressing of nested values
//! - Structural comparison of two parallel graphs (base/derived linking)
//!
//! ## Architecture
//!
//! - [`NodeContainer`] owns every node in a generational arena and keeps an
//!   identity map from live instances to their object nodes.
//! - Object nodes own ordered member nodes; member nodes holding an object or
//!   struct point at the node modeling it through an [`ObjectReference`].
//!   Collections and dictionaries of non-primitive items hold an
//!   [`EnumerableReference`].
//! - Mutations go through the container, raise changing/changed events and
//!   reconcile references through an explicit [`RefreshPlan`].
//! - [`GraphNodePath`], [`GraphVisitor`] and [`GraphNodeLinker`] work purely on
//!   the container's public queries.

pub mod arena;
mod builder;
pub mod config;
pub mod container;
pub mod dynamic;
pub mod error;
pub mod events;
pub mod index;
pub mod linker;
pub mod listener;
pub mod node;
pub mod path;
pub mod reference;
pub mod refresh;
mod state;
mod update;
pub mod visitor;

#[cfg(test)]
pub(crate) mod test_support;

pub use arena::NodeHandle;
pub use config::{ConfigError, MemberKindPolicy, ModelConfig};
pub use container::NodeContainer;
pub use dynamic::{Accessor, DynamicNode};
pub use error::{AddressingError, ConsistencyError, GraphError, Result, ShapeViolation};
pub use events::{ChangeEvent, ChangeKind, ChangePhase, NodeChangeHandler, SubscriptionId};
pub use index::NodeIndex;
pub use linker::{GraphNodeLinker, LinkContext, LinkHandler, LinkState};
pub use listener::GraphChangeListener;
pub use node::{BoxOwner, NodeId, NodeInfo, NodeKind};
pub use path::{GraphNodePath, NodeAccessor, PathElement};
pub use reference::{EnumerableReference, ObjectReference};
pub use refresh::{ReconcileAction, RefreshPlan, RefreshScope, TargetSpec};
pub use visitor::{FnVisitor, GraphVisitor, VisitOptions, VisitState};
