// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pairing of corresponding nodes across two parallel graphs.
//!
//! The linker visits a source graph and, for every source node, finds the
//! node playing the same role in a target graph. Member nodes are matched by
//! name under the paired parent. Reference targets are matched through the
//! paired member (for single targets) or by index (for items). A source node
//! without a correspondent is paired with `None`.
//!
//! A source object that already has a pairing is not descended into again,
//! which both stops cycles and processes shared objects once.

use crate::arena::NodeHandle;
use crate::container::NodeContainer;
use crate::error::Result;
use crate::index::NodeIndex;
use crate::node::NodeKind;
use crate::visitor::{self, GraphVisitor, VisitOptions, VisitState};
use std::collections::HashMap;
use tracing::debug;

/// Progress of a source node through a link pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkState {
    /// Not reached yet
    #[default]
    Unvisited,
    /// Reached, correspondent not computed yet
    Visiting,
    /// Correspondent computed, link callback pending
    Paired,
    /// Link callback fired and children processed
    Linked,
}

/// What link handlers see of an ongoing pass
#[derive(Clone, Copy)]
pub struct LinkContext<'a> {
    /// Container of the source graph
    pub source: &'a NodeContainer,
    /// Container of the target graph
    pub target: &'a NodeContainer,
    links: &'a HashMap<NodeHandle, Option<NodeHandle>>,
}

impl LinkContext<'_> {
    /// Target paired with a source node so far, if any
    pub fn linked(&self, source: NodeHandle) -> Option<NodeHandle> {
        self.links.get(&source).copied().flatten()
    }

    /// Check whether a source node has been paired, possibly with nothing
    pub fn is_paired(&self, source: NodeHandle) -> bool {
        self.links.contains_key(&source)
    }
}

/// Callbacks of a link pass
pub trait LinkHandler {
    /// Called once per source node with its correspondent
    fn link_nodes(
        &mut self,
        context: &LinkContext<'_>,
        source: NodeHandle,
        target: Option<NodeHandle>,
    ) -> Result<()>;

    /// Find the correspondent of a source node
    fn find_target(
        &mut self,
        context: &LinkContext<'_>,
        source: NodeHandle,
    ) -> Result<Option<NodeHandle>> {
        default_find_target(context, source)
    }

    /// Find the target-side node referenced by the correspondent of `owner`
    ///
    /// `index` is empty for the target of a member node and holds the item
    /// index otherwise.
    fn find_target_reference(
        &mut self,
        context: &LinkContext<'_>,
        owner: NodeHandle,
        index: &NodeIndex,
    ) -> Result<Option<NodeHandle>> {
        default_find_target_reference(context, owner, index)
    }
}

/// Members match by name under the paired parent; objects use their pairing
pub fn default_find_target(context: &LinkContext<'_>, source: NodeHandle) -> Result<Option<NodeHandle>> {
    if context.source.kind(source)? != NodeKind::Member {
        return Ok(context.linked(source));
    }
    let parent = context.source.parent(source)?;
    let Some(target_parent) = context.linked(parent) else {
        return Ok(None);
    };
    let name = context.source.member_name(source)?;
    Ok(context.target.find_member(target_parent, &name))
}

/// Follow the paired owner's reference, by member or by item index
pub fn default_find_target_reference(
    context: &LinkContext<'_>,
    owner: NodeHandle,
    index: &NodeIndex,
) -> Result<Option<NodeHandle>> {
    let Some(target_owner) = context.linked(owner) else {
        return Ok(None);
    };
    match (context.target.kind(target_owner)?, index.is_empty()) {
        (NodeKind::Member, true) => context.target.target(target_owner),
        (NodeKind::Object | NodeKind::Boxed, false) => context.target.indexed_target(target_owner, index),
        _ => Ok(None),
    }
}

/// Pairs nodes of a source graph with nodes of a target graph
#[derive(Debug, Default)]
pub struct GraphNodeLinker<H> {
    handler: H,
    links: HashMap<NodeHandle, Option<NodeHandle>>,
    states: HashMap<NodeHandle, LinkState>,
}

impl<H: LinkHandler> GraphNodeLinker<H> {
    /// Create a linker around a handler
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            links: HashMap::new(),
            states: HashMap::new(),
        }
    }

    /// The handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The handler, mutably
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the linker and return its handler
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Link the graph under `source_root` with the graph under `target_root`
    ///
    /// Results of a previous pass are discarded.
    pub fn link_graph(
        &mut self,
        source: &NodeContainer,
        source_root: NodeHandle,
        target: &NodeContainer,
        target_root: Option<NodeHandle>,
    ) -> Result<()> {
        self.links.clear();
        self.states.clear();
        self.links.insert(source_root, target_root);

        let mut visitor = LinkVisitor {
            handler: &mut self.handler,
            source,
            target,
            links: &mut self.links,
            states: &mut self.states,
        };
        visitor::visit(&mut visitor, source, source_root, VisitOptions::default())?;

        debug!(
            nodes = self.links.len(),
            unmatched = self.links.values().filter(|t| t.is_none()).count(),
            "Graphs linked"
        );
        Ok(())
    }

    /// Correspondent of a source node from the last pass
    pub fn linked_target(&self, source: NodeHandle) -> Option<NodeHandle> {
        self.links.get(&source).copied().flatten()
    }

    /// Progress of a source node in the last pass
    pub fn link_state(&self, source: NodeHandle) -> LinkState {
        self.states.get(&source).copied().unwrap_or_default()
    }

    /// Every pairing of the last pass
    pub fn linked_nodes(&self) -> impl Iterator<Item = (NodeHandle, Option<NodeHandle>)> + '_ {
        self.links.iter().map(|(source, target)| (*source, *target))
    }
}

struct LinkVisitor<'a, H> {
    handler: &'a mut H,
    source: &'a NodeContainer,
    target: &'a NodeContainer,
    links: &'a mut HashMap<NodeHandle, Option<NodeHandle>>,
    states: &'a mut HashMap<NodeHandle, LinkState>,
}

impl<H: LinkHandler> LinkVisitor<'_, H> {
    fn is_unvisited(&self, node: NodeHandle) -> bool {
        self.states.get(&node).copied().unwrap_or_default() == LinkState::Unvisited
    }

    fn pair_reference(&mut self, owner: NodeHandle, index: &NodeIndex, referenced: NodeHandle) -> Result<()> {
        let context = LinkContext {
            source: self.source,
            target: self.target,
            links: &*self.links,
        };
        let found = self.handler.find_target_reference(&context, owner, index)?;
        self.links.insert(referenced, found);
        Ok(())
    }
}

impl<H: LinkHandler> GraphVisitor for LinkVisitor<'_, H> {
    fn visit_node(&mut self, state: &mut VisitState<'_>, node: NodeHandle) -> Result<()> {
        self.states.insert(node, LinkState::Visiting);
        let context = LinkContext {
            source: self.source,
            target: self.target,
            links: &*self.links,
        };
        let found = self.handler.find_target(&context, node)?;
        self.links.insert(node, found);
        self.states.insert(node, LinkState::Paired);

        let context = LinkContext {
            source: self.source,
            target: self.target,
            links: &*self.links,
        };
        self.handler.link_nodes(&context, node, found)?;
        visitor::walk_node(self, state, node)?;
        self.states.insert(node, LinkState::Linked);
        Ok(())
    }

    fn visit_member_target(
        &mut self,
        state: &mut VisitState<'_>,
        member: NodeHandle,
        target: NodeHandle,
    ) -> Result<()> {
        self.pair_reference(member, &NodeIndex::Empty, target)?;
        visitor::walk_member_target(self, state, member, target)
    }

    fn visit_item_target(
        &mut self,
        state: &mut VisitState<'_>,
        owner: NodeHandle,
        index: &NodeIndex,
        target: NodeHandle,
    ) -> Result<()> {
        self.pair_reference(owner, index, target)?;
        visitor::walk_item_target(self, state, owner, index, target)
    }

    fn should_visit_member_target(&mut self, state: &VisitState<'_>, _member: NodeHandle, target: NodeHandle) -> bool {
        !state.is_being_visited(target) && self.is_unvisited(target)
    }

    fn should_visit_item_target(
        &mut self,
        state: &VisitState<'_>,
        _owner: NodeHandle,
        _index: &NodeIndex,
        target: NodeHandle,
    ) -> bool {
        !state.is_being_visited(target) && self.is_unvisited(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use ordoplay_editor_reflect::{ObjectRef, Value};

    #[derive(Default)]
    struct Recorder {
        pairs: Vec<(NodeHandle, Option<NodeHandle>)>,
    }

    impl LinkHandler for Recorder {
        fn link_nodes(&mut self, _: &LinkContext<'_>, source: NodeHandle, target: Option<NodeHandle>) -> Result<()> {
            self.pairs.push((source, target));
            Ok(())
        }
    }

    fn chain(value: i64) -> ObjectRef {
        simple_class(value, Some(simple_class(value + 1, None)))
    }

    #[test]
    fn test_identical_graphs_link_every_node() {
        let source = container();
        let target = container();
        let source_instance = chain(1);
        let source_root = source.get_or_create_node(&source_instance.clone().into()).unwrap();
        let target_instance = chain(1);
        let target_root = target.get_or_create_node(&target_instance.clone().into()).unwrap();

        let mut linker = GraphNodeLinker::new(Recorder::default());
        linker.link_graph(&source, source_root, &target, Some(target_root)).unwrap();

        let pairs = &linker.handler().pairs;
        // root, 2 members, child, 2 members
        assert_eq!(pairs.len(), 6);
        for (s, t) in pairs {
            let t = t.expect("every source node has a correspondent");
            assert_eq!(source.retrieve(*s).unwrap().is_null(), target.retrieve(t).unwrap().is_null());
            assert_eq!(source.kind(*s).unwrap(), target.kind(t).unwrap());
            assert_eq!(linker.link_state(*s), LinkState::Linked);
        }

        let source_child = source.target(source.member(source_root, "Member2").unwrap()).unwrap().unwrap();
        let target_child = target.target(target.member(target_root, "Member2").unwrap()).unwrap().unwrap();
        assert_eq!(linker.linked_target(source_child), Some(target_child));
        assert_eq!(
            linker.linked_target(source.member(source_child, "Member1").unwrap()),
            Some(target.member(target_child, "Member1").unwrap())
        );
    }

    #[test]
    fn test_absent_target_graph() {
        let source = container();
        let target = container();
        let instance = chain(1);
        let source_root = source.get_or_create_node(&instance.clone().into()).unwrap();

        let mut linker = GraphNodeLinker::new(Recorder::default());
        linker.link_graph(&source, source_root, &target, None).unwrap();

        let pairs = linker.into_handler().pairs;
        assert_eq!(pairs.len(), 6);
        assert!(pairs.iter().all(|(_, t)| t.is_none()));
    }

    #[test]
    fn test_missing_target_reference() {
        let source = container();
        let target = container();
        let source_instance = chain(1);
        let source_root = source.get_or_create_node(&source_instance.clone().into()).unwrap();
        let target_instance = simple_class(1, None);
        let target_root = target.get_or_create_node(&target_instance.clone().into()).unwrap();

        let mut linker = GraphNodeLinker::new(Recorder::default());
        linker.link_graph(&source, source_root, &target, Some(target_root)).unwrap();

        let source_child = source.target(source.member(source_root, "Member2").unwrap()).unwrap().unwrap();
        assert_eq!(
            linker.linked_target(source.member(source_root, "Member2").unwrap()),
            Some(target.member(target_root, "Member2").unwrap())
        );
        assert_eq!(linker.linked_target(source_child), None);
        assert_eq!(linker.link_state(source_child), LinkState::Linked);
    }

    #[test]
    fn test_cycles_and_shared_objects_link_once() {
        let source = container();
        let a = simple_class(1, None);
        let b = simple_class(2, Some(a.clone()));
        a.set_field("Member2", b.clone()).unwrap();
        let list = ObjectRef::list("List<SimpleClass>", [a.clone().into(), a.clone().into()]);
        let root = source.get_or_create_node(&list.clone().into()).unwrap();

        let mut linker = GraphNodeLinker::new(Recorder::default());
        linker.link_graph(&source, root, &source, Some(root)).unwrap();

        let pairs = &linker.handler().pairs;
        // list, a + 2 members, b + 2 members
        assert_eq!(pairs.len(), 7);
        assert!(pairs.iter().all(|(s, t)| Some(*s) == *t));

        a.set_field("Member2", Value::Null).unwrap();
    }

    #[test]
    fn test_items_match_by_index() {
        let source = container();
        let target = container();
        let source_list = ObjectRef::list(
            "List<SimpleClass>",
            [simple_class(1, None).into(), simple_class(2, None).into()],
        );
        let target_first = simple_class(1, None);
        let target_list = ObjectRef::list("List<SimpleClass>", [target_first.clone().into()]);
        let source_root = source.get_or_create_node(&source_list.clone().into()).unwrap();
        let target_root = target.get_or_create_node(&target_list.clone().into()).unwrap();

        let mut linker = GraphNodeLinker::new(Recorder::default());
        linker.link_graph(&source, source_root, &target, Some(target_root)).unwrap();

        let first = source.indexed_target(source_root, &NodeIndex::new(0)).unwrap().unwrap();
        let second = source.indexed_target(source_root, &NodeIndex::new(1)).unwrap().unwrap();
        assert_eq!(linker.linked_target(first), target.get_node(&target_first.into()));
        assert_eq!(linker.linked_target(second), None);
        assert_eq!(linker.link_state(second), LinkState::Linked);
    }

    #[test]
    fn test_find_target_override() {
        struct NoMembers(Vec<(NodeHandle, Option<NodeHandle>)>);
        impl LinkHandler for NoMembers {
            fn link_nodes(&mut self, _: &LinkContext<'_>, s: NodeHandle, t: Option<NodeHandle>) -> Result<()> {
                self.0.push((s, t));
                Ok(())
            }
            fn find_target(&mut self, context: &LinkContext<'_>, source: NodeHandle) -> Result<Option<NodeHandle>> {
                if context.source.kind(source)? == NodeKind::Member {
                    return Ok(None);
                }
                default_find_target(context, source)
            }
        }

        let source = container();
        let instance = chain(1);
        let source_root = source.get_or_create_node(&instance.clone().into()).unwrap();
        let mut linker = GraphNodeLinker::new(NoMembers(Vec::new()));
        linker.link_graph(&source, source_root, &source, Some(source_root)).unwrap();

        let pairs = &linker.handler().0;
        assert_eq!(pairs[0], (source_root, Some(source_root)));
        // the child is reached through an unpaired member
        assert_eq!(pairs.iter().filter(|(_, t)| t.is_some()).count(), 1);
    }
}
