// SPDX-License-Identifier: MIT OR Apache-2.0
//! The node container: node ownership, identity map and graph queries.

use crate::arena::NodeHandle;
use crate::builder::build;
use crate::config::ModelConfig;
use crate::error::{AddressingError, Result, ShapeViolation};
use crate::events::Subscription;
use crate::index::NodeIndex;
use crate::node::{BoxOwner, NodeData, NodeId, NodeInfo, NodeKind, ObjectSource};
use crate::reference::{EnumerableReference, ObjectReference};
use crate::refresh::{self, RefreshPlan, RefreshScope};
use crate::state::GraphState;
use ordoplay_editor_reflect::{
    MemberDescriptor, TypeDescriptor, TypeDescriptorProvider, TypeName, Value,
};
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::RefCell;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Owns every node of a graph
///
/// Each live instance is modeled by exactly one object node; asking for the
/// node of an instance that is already modeled returns the existing node.
/// All operations are serialized by a re-entrant lock, so change handlers may
/// call back into the container while an update is in flight.
pub struct NodeContainer {
    provider: Arc<dyn TypeDescriptorProvider>,
    config: ModelConfig,
    state: ReentrantMutex<RefCell<GraphState>>,
    pub(crate) subscriptions: RwLock<Vec<Subscription>>,
    pub(crate) next_subscription: AtomicU64,
}

impl NodeContainer {
    /// Create an empty container with the default configuration
    pub fn new(provider: Arc<dyn TypeDescriptorProvider>) -> Self {
        Self::with_config(provider, ModelConfig::default())
    }

    /// Create an empty container
    pub fn with_config(provider: Arc<dyn TypeDescriptorProvider>, config: ModelConfig) -> Self {
        Self {
            provider,
            config,
            state: ReentrantMutex::new(RefCell::new(GraphState::default())),
            subscriptions: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Type descriptor provider used to build nodes
    pub fn provider(&self) -> &dyn TypeDescriptorProvider {
        &*self.provider
    }

    /// Container configuration
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Hold the container lock across several calls
    pub(crate) fn lock(&self) -> parking_lot::ReentrantMutexGuard<'_, RefCell<GraphState>> {
        self.state.lock()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&GraphState) -> Result<R>) -> Result<R> {
        let guard = self.state.lock();
        let state = guard.borrow();
        f(&state)
    }

    pub(crate) fn write<R>(
        &self,
        f: impl FnOnce(&mut GraphState, &dyn TypeDescriptorProvider) -> Result<R>,
    ) -> Result<R> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state, &*self.provider)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Get the node modeling `value`, building it and its subgraph if needed
    ///
    /// Instances are looked up in the identity map first. Struct values are
    /// copied into a new boxed node on every call. Primitives and null are
    /// never modeled as standalone nodes.
    pub fn get_or_create_node(&self, value: &Value) -> Result<NodeHandle> {
        match value {
            Value::Object(object) => {
                let node = self.write(|state, provider| build(state, provider, |b| b.instance_node(object)))?;
                tracing::trace!("Node {} models {:?}", node, object);
                Ok(node)
            }
            Value::Struct(boxed) => self.write(|state, provider| {
                build(state, provider, |b| {
                    b.boxed_node(BoxOwner::Detached(boxed.clone()), boxed.type_name())
                })
            }),
            other => Err(ShapeViolation::PrimitiveRoot(
                other.type_name().unwrap_or_else(|| TypeName::new("null")),
            )
            .into()),
        }
    }

    /// Get the node modeling an instance, without building anything
    pub fn get_node(&self, value: &Value) -> Option<NodeHandle> {
        let object = value.as_object()?;
        let guard = self.state.lock();
        let state = guard.borrow();
        state.lookup_instance(object)
    }

    /// Add a member node to an object node still under construction
    ///
    /// Object nodes are sealed once built, so this fails for every node
    /// reachable from the public API.
    pub fn add_member(&self, node: NodeHandle, member: &MemberDescriptor) -> Result<NodeHandle> {
        self.write(|state, provider| build(state, provider, |b| b.member_node(node, member)))
    }

    /// Remove every node
    pub fn clear(&self) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let count = state.nodes.len();
        state.nodes.clear();
        state.identity.clear();
        tracing::debug!("Cleared {} node(s)", count);
    }

    /// Remove the nodes of instances that no longer exist
    ///
    /// Returns the number of nodes removed, members and boxed nodes included.
    pub fn collect_garbage(&self) -> usize {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let dead: Vec<NodeHandle> = state
            .nodes
            .iter()
            .filter_map(|(handle, entry)| match &entry.data {
                NodeData::Object(object) => match &object.source {
                    ObjectSource::Instance(weak) if !weak.is_alive() => Some(handle),
                    _ => None,
                },
                NodeData::Member(_) => None,
            })
            .collect();

        let mut removed = 0;
        for node in dead {
            removed += state.free_subtree(node);
        }
        let state = &mut *state;
        let nodes = &state.nodes;
        state
            .identity
            .retain(|_, entry| entry.object.is_alive() && nodes.contains(entry.node));
        if removed > 0 {
            tracing::debug!("Collected {} node(s) of dropped instances", removed);
        }
        removed
    }

    /// Number of nodes in the container
    pub fn len(&self) -> usize {
        self.state.lock().borrow().nodes.len()
    }

    /// Check whether the container holds no nodes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether a handle refers to a live node
    pub fn contains(&self, node: NodeHandle) -> bool {
        self.state.lock().borrow().nodes.contains(node)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Descriptive snapshot of a node
    pub fn node(&self, node: NodeHandle) -> Result<NodeInfo> {
        self.read(|state| Ok(NodeInfo::from_entry(node, state.entry(node)?)))
    }

    /// Kind of a node
    pub fn kind(&self, node: NodeHandle) -> Result<NodeKind> {
        self.read(|state| Ok(state.entry(node)?.kind()))
    }

    /// Unique ID of a node
    pub fn node_id(&self, node: NodeHandle) -> Result<NodeId> {
        self.read(|state| Ok(state.entry(node)?.id))
    }

    /// Descriptor a node was built from
    pub fn descriptor(&self, node: NodeHandle) -> Result<TypeDescriptor> {
        self.read(|state| Ok(state.entry(node)?.descriptor.clone()))
    }

    /// Member nodes of an object or boxed node, in declaration order
    pub fn members(&self, node: NodeHandle) -> Result<Vec<NodeHandle>> {
        self.read(|state| Ok(state.object(node)?.members.values().copied().collect()))
    }

    /// Member node by name
    pub fn member(&self, node: NodeHandle, name: &str) -> Result<NodeHandle> {
        self.read(|state| {
            let id = state.entry(node)?.id;
            state
                .object(node)?
                .members
                .get(name)
                .copied()
                .ok_or_else(|| {
                    AddressingError::MemberNotFound {
                        node: id,
                        member: name.to_string(),
                    }
                    .into()
                })
        })
    }

    /// Member node by name, `None` when missing or when `node` has no members
    pub fn find_member(&self, node: NodeHandle, name: &str) -> Option<NodeHandle> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.object(node).ok()?.members.get(name).copied()
    }

    /// Name of a member node
    pub fn member_name(&self, node: NodeHandle) -> Result<String> {
        self.read(|state| Ok(state.member(node)?.name.clone()))
    }

    /// Object or boxed node owning a member node
    pub fn parent(&self, node: NodeHandle) -> Result<NodeHandle> {
        self.read(|state| Ok(state.member(node)?.parent))
    }

    /// Target of a member node; `None` for null values and primitives
    pub fn target(&self, node: NodeHandle) -> Result<Option<NodeHandle>> {
        self.read(|state| Ok(state.member(node)?.reference.and_then(|r| r.target())))
    }

    /// Reference held by a member node; `None` while it holds a primitive
    pub fn target_reference(&self, node: NodeHandle) -> Result<Option<ObjectReference>> {
        self.read(|state| Ok(state.member(node)?.reference))
    }

    /// Target of an item of a collection or dictionary node
    ///
    /// `None` when the item is null or primitive, when the index is not
    /// tracked, or when the node holds no item references.
    pub fn indexed_target(&self, node: NodeHandle, index: &NodeIndex) -> Result<Option<NodeHandle>> {
        self.read(|state| {
            Ok(state
                .object(node)?
                .items
                .as_ref()
                .and_then(|items| items.get(index))
                .and_then(ObjectReference::target))
        })
    }

    /// Item references of a collection or dictionary node
    pub fn item_references(&self, node: NodeHandle) -> Result<Option<EnumerableReference>> {
        self.read(|state| Ok(state.object(node)?.items.clone()))
    }

    /// Current indices of a collection or dictionary node, in order
    pub fn indices(&self, node: NodeHandle) -> Result<Vec<NodeIndex>> {
        self.read(|state| {
            state.object(node)?;
            Ok(state
                .live_entries(node)?
                .into_iter()
                .map(|(index, _)| index)
                .collect())
        })
    }

    /// Owner of a boxed node; `None` for object nodes
    pub fn box_owner(&self, node: NodeHandle) -> Result<Option<BoxOwner>> {
        self.read(|state| Ok(state.object(node)?.boxed_owner().cloned()))
    }

    /// Check whether a node's construction has finished
    pub fn is_sealed(&self, node: NodeHandle) -> Result<bool> {
        self.read(|state| match &state.entry(node)?.data {
            NodeData::Object(object) => Ok(object.sealed),
            NodeData::Member(_) => Ok(true),
        })
    }

    /// Current value modeled by a node, read from the live data
    pub fn retrieve(&self, node: NodeHandle) -> Result<Value> {
        self.read(|state| state.value_of(node))
    }

    /// Current value of a node or of one of its items
    pub fn retrieve_at(&self, node: NodeHandle, index: &NodeIndex) -> Result<Value> {
        self.read(|state| state.value_at(node, index))
    }

    // ------------------------------------------------------------------
    // Reference reconciliation
    // ------------------------------------------------------------------

    /// Compute which references of a subtree disagree with the live data
    pub fn plan_refresh(&self, node: NodeHandle, scope: RefreshScope) -> Result<RefreshPlan> {
        self.read(|state| refresh::plan(state, node, scope))
    }

    /// Apply a previously computed plan
    pub fn apply_refresh(&self, plan: &RefreshPlan) -> Result<usize> {
        self.write(|state, provider| refresh::apply(state, provider, plan.actions()))
    }

    /// Plan and apply a refresh of a subtree in one step
    pub fn refresh_references(&self, node: NodeHandle, scope: RefreshScope) -> Result<usize> {
        self.write(|state, provider| {
            let plan = refresh::plan(state, node, scope)?;
            refresh::apply(state, provider, plan.actions())
        })
    }
}

impl std::fmt::Debug for NodeContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContainer")
            .field("config", &self.config)
            .field("nodes", &self.len())
            .finish_non_exhaustive()
    }
}
