// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notifications scoped to the graph reachable from a root.
//!
//! A [`GraphChangeListener`] subscribes to its container and forwards only
//! the notifications raised by nodes reachable from its root. Reachability
//! is recomputed after every change, so an object discarded by an update
//! stops reporting and a newly referenced one starts. A root that can no
//! longer be visited stops all forwarding.

use crate::arena::NodeHandle;
use crate::container::NodeContainer;
use crate::error::Result;
use crate::events::{ChangeEvent, NodeChangeHandler, SubscriptionId};
use crate::index::NodeIndex;
use crate::visitor::{self, GraphVisitor, VisitOptions, VisitState};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Forwards the changes of a rooted subgraph to its own handlers
pub struct GraphChangeListener {
    container: Arc<NodeContainer>,
    inner: Arc<ListenerInner>,
    subscription: Option<SubscriptionId>,
}

struct ListenerInner {
    root: NodeHandle,
    tracked: RwLock<HashSet<NodeHandle>>,
    handlers: RwLock<Vec<Arc<dyn NodeChangeHandler>>>,
}

impl GraphChangeListener {
    /// Create a listener for the graph under `root`; call
    /// [`initialize`](Self::initialize) to start listening
    pub fn new(container: Arc<NodeContainer>, root: NodeHandle) -> Self {
        Self {
            container,
            inner: Arc::new(ListenerInner {
                root,
                tracked: RwLock::new(HashSet::new()),
                handlers: RwLock::new(Vec::new()),
            }),
            subscription: None,
        }
    }

    /// Compute the reachable nodes and subscribe to the container
    pub fn initialize(&mut self) -> Result<()> {
        let reachable = reachable_nodes(&self.container, self.inner.root)?;
        *self.inner.tracked.write() = reachable;
        if self.subscription.is_none() {
            let handler: Arc<dyn NodeChangeHandler> = self.inner.clone();
            self.subscription = Some(self.container.subscribe(handler));
        }
        Ok(())
    }

    /// Root of the listened graph
    pub fn root(&self) -> NodeHandle {
        self.inner.root
    }

    /// Register a handler receiving the forwarded notifications
    pub fn add_handler(&self, handler: Arc<dyn NodeChangeHandler>) {
        self.inner.handlers.write().push(handler);
    }

    /// Check whether changes of `node` are currently forwarded
    pub fn is_tracking(&self, node: NodeHandle) -> bool {
        self.inner.tracked.read().contains(&node)
    }

    /// Nodes whose changes are currently forwarded
    pub fn tracked_nodes(&self) -> Vec<NodeHandle> {
        self.inner.tracked.read().iter().copied().collect()
    }
}

impl Drop for GraphChangeListener {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.container.unsubscribe(id);
        }
    }
}

impl std::fmt::Debug for GraphChangeListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphChangeListener")
            .field("root", &self.inner.root)
            .field("tracked", &self.inner.tracked.read().len())
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl ListenerInner {
    fn forward(&self, event: &ChangeEvent, notify: impl Fn(&dyn NodeChangeHandler)) {
        if !self.tracked.read().contains(&event.node) {
            return;
        }
        let handlers: Vec<_> = self.handlers.read().iter().cloned().collect();
        for handler in handlers {
            notify(handler.as_ref());
        }
    }

    fn refresh(&self, container: &NodeContainer) {
        match reachable_nodes(container, self.root) {
            Ok(reachable) => {
                debug!(root = %self.root, nodes = reachable.len(), "Listener reachability updated");
                *self.tracked.write() = reachable;
            }
            Err(error) => {
                warn!(root = %self.root, %error, "Failed to update listener reachability");
                self.tracked.write().clear();
            }
        }
    }
}

impl NodeChangeHandler for ListenerInner {
    fn value_changing(&self, container: &NodeContainer, event: &ChangeEvent) {
        self.forward(event, |h| h.value_changing(container, event));
    }

    fn value_changed(&self, container: &NodeContainer, event: &ChangeEvent) {
        self.forward(event, |h| h.value_changed(container, event));
        self.refresh(container);
    }

    fn item_changing(&self, container: &NodeContainer, event: &ChangeEvent) {
        self.forward(event, |h| h.item_changing(container, event));
    }

    fn item_changed(&self, container: &NodeContainer, event: &ChangeEvent) {
        self.forward(event, |h| h.item_changed(container, event));
        self.refresh(container);
    }
}

#[derive(Default)]
struct ReachableCollector(HashSet<NodeHandle>);

impl GraphVisitor for ReachableCollector {
    fn visiting(&mut self, _state: &VisitState<'_>, node: NodeHandle) -> Result<()> {
        self.0.insert(node);
        Ok(())
    }

    fn should_visit_member_target(&mut self, _state: &VisitState<'_>, _member: NodeHandle, target: NodeHandle) -> bool {
        !self.0.contains(&target)
    }

    fn should_visit_item_target(
        &mut self,
        _state: &VisitState<'_>,
        _owner: NodeHandle,
        _index: &NodeIndex,
        target: NodeHandle,
    ) -> bool {
        !self.0.contains(&target)
    }
}

fn reachable_nodes(container: &NodeContainer, root: NodeHandle) -> Result<HashSet<NodeHandle>> {
    let mut collector = ReachableCollector::default();
    visitor::visit(&mut collector, container, root, VisitOptions::default())?;
    Ok(collector.0)
}
