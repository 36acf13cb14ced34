// SPDX-License-Identifier: MIT OR Apache-2.0
//! Depth-first traversal of a node graph.
//!
//! Starting from a root, a visit announces each node, then walks its members
//! in declaration order (each member followed by its target), then the
//! targets of its items. A target that is already on the visitation stack is
//! skipped, so cycles terminate. Shared objects reached along different paths
//! are visited once per path.
//!
//! Every step is an overridable trait method with a `walk_*` function holding
//! the default behavior, so visitors can customize one step and delegate the
//! rest.

use crate::arena::NodeHandle;
use crate::container::NodeContainer;
use crate::error::Result;
use crate::index::NodeIndex;
use crate::node::NodeKind;
use crate::path::GraphNodePath;

/// Visit options
#[derive(Debug, Clone, Default)]
pub struct VisitOptions {
    /// Path reported for the root; defaults to an empty path at the root
    pub initial_path: Option<GraphNodePath>,
    /// Do not announce the root node
    pub skip_root_notification: bool,
}

/// Traversal state shared by every step of a visit
#[derive(Debug)]
pub struct VisitState<'c> {
    container: &'c NodeContainer,
    root: NodeHandle,
    path: GraphNodePath,
    stack: Vec<NodeHandle>,
    skip_root: bool,
}

impl<'c> VisitState<'c> {
    /// Container being visited
    pub fn container(&self) -> &'c NodeContainer {
        self.container
    }

    /// Root of the visit
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Path of the node currently being visited
    pub fn current_path(&self) -> &GraphNodePath {
        &self.path
    }

    /// Check whether `node` is on the visitation stack
    pub fn is_being_visited(&self, node: NodeHandle) -> bool {
        self.stack.contains(&node)
    }

    /// Number of nodes on the visitation stack
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// A graph visitor
pub trait GraphVisitor {
    /// Called when a node is reached, before its children
    fn visiting(&mut self, _state: &VisitState<'_>, _node: NodeHandle) -> Result<()> {
        Ok(())
    }

    /// Visit a node: announce it, then its children
    fn visit_node(&mut self, state: &mut VisitState<'_>, node: NodeHandle) -> Result<()> {
        walk_node(self, state, node)
    }

    /// Visit members and item targets of an object node, or the target of a member node
    fn visit_children(&mut self, state: &mut VisitState<'_>, node: NodeHandle) -> Result<()> {
        walk_children(self, state, node)
    }

    /// Visit the target of a member node
    fn visit_member_target(
        &mut self,
        state: &mut VisitState<'_>,
        member: NodeHandle,
        target: NodeHandle,
    ) -> Result<()> {
        walk_member_target(self, state, member, target)
    }

    /// Visit the target of an item
    fn visit_item_target(
        &mut self,
        state: &mut VisitState<'_>,
        owner: NodeHandle,
        index: &NodeIndex,
        target: NodeHandle,
    ) -> Result<()> {
        walk_item_target(self, state, owner, index, target)
    }

    /// Decide whether to descend into a member's target
    fn should_visit_member_target(
        &mut self,
        state: &VisitState<'_>,
        _member: NodeHandle,
        target: NodeHandle,
    ) -> bool {
        !state.is_being_visited(target)
    }

    /// Decide whether to descend into an item's target
    fn should_visit_item_target(
        &mut self,
        state: &VisitState<'_>,
        _owner: NodeHandle,
        _index: &NodeIndex,
        target: NodeHandle,
    ) -> bool {
        !state.is_being_visited(target)
    }
}

/// Visit the graph rooted at `root`
pub fn visit<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    container: &NodeContainer,
    root: NodeHandle,
    options: VisitOptions,
) -> Result<()> {
    let mut state = VisitState {
        container,
        root,
        path: options
            .initial_path
            .unwrap_or_else(|| GraphNodePath::new(root)),
        stack: Vec::new(),
        skip_root: options.skip_root_notification,
    };
    visitor.visit_node(&mut state, root)
}

/// Default node step
pub fn walk_node<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    state: &mut VisitState<'_>,
    node: NodeHandle,
) -> Result<()> {
    let is_root = state.stack.is_empty() && node == state.root;
    if !(is_root && state.skip_root) {
        visitor.visiting(state, node)?;
    }
    state.stack.push(node);
    let result = visitor.visit_children(state, node);
    state.stack.pop();
    result
}

/// Default children step
pub fn walk_children<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    state: &mut VisitState<'_>,
    node: NodeHandle,
) -> Result<()> {
    let container = state.container;
    match container.kind(node)? {
        NodeKind::Member => {
            if let Some(target) = container.target(node)? {
                if visitor.should_visit_member_target(state, node, target) {
                    visitor.visit_member_target(state, node, target)?;
                }
            }
        }
        NodeKind::Object | NodeKind::Boxed => {
            for member in container.members(node)? {
                state.path.push_member(container.member_name(member)?);
                let result = visitor.visit_node(state, member);
                state.path.pop();
                result?;
            }
            if let Some(items) = container.item_references(node)? {
                for (index, reference) in items.iter() {
                    let Some(target) = reference.target() else {
                        continue;
                    };
                    if visitor.should_visit_item_target(state, node, index, target) {
                        visitor.visit_item_target(state, node, index, target)?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Default member target step
pub fn walk_member_target<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    state: &mut VisitState<'_>,
    _member: NodeHandle,
    target: NodeHandle,
) -> Result<()> {
    state.path.push_target();
    let result = visitor.visit_node(state, target);
    state.path.pop();
    result
}

/// Default item target step
pub fn walk_item_target<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    state: &mut VisitState<'_>,
    _owner: NodeHandle,
    index: &NodeIndex,
    target: NodeHandle,
) -> Result<()> {
    state.path.push_index(index.clone());
    let result = visitor.visit_node(state, target);
    state.path.pop();
    result
}

/// Visitor calling a closure for every announced node
pub struct FnVisitor<F> {
    f: F,
}

impl<F: FnMut(NodeHandle, &GraphNodePath)> FnVisitor<F> {
    /// Wrap a closure
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F: FnMut(NodeHandle, &GraphNodePath)> GraphVisitor for FnVisitor<F> {
    fn visiting(&mut self, state: &VisitState<'_>, node: NodeHandle) -> Result<()> {
        (self.f)(node, state.current_path());
        Ok(())
    }
}
