// SPDX-License-Identifier: MIT OR Apache-2.0
//! Name- and index-based navigation over the node graph.
//!
//! ```ignore
//! let root = DynamicNode::new(&container, node);
//! root.member("Child")?.member("Value")?.set(5)?;
//! let tag = root.member("Tags")?.item(NodeIndex::new(1))?.retrieve()?;
//! ```

use crate::arena::NodeHandle;
use crate::container::NodeContainer;
use crate::error::{AddressingError, Result};
use crate::index::NodeIndex;
use crate::node::NodeKind;
use ordoplay_editor_reflect::Value;

/// One navigation step
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Accessor {
    /// Member by name
    Member(String),
    /// Item by index
    Index(NodeIndex),
}

impl From<&str> for Accessor {
    fn from(name: &str) -> Self {
        Self::Member(name.to_string())
    }
}

impl From<String> for Accessor {
    fn from(name: String) -> Self {
        Self::Member(name)
    }
}

impl From<NodeIndex> for Accessor {
    fn from(index: NodeIndex) -> Self {
        Self::Index(index)
    }
}

impl From<usize> for Accessor {
    fn from(index: usize) -> Self {
        Self::Index(NodeIndex::new(index))
    }
}

/// A node, or an item of a node, reached by navigation
///
/// Navigating from a member steps through its target; navigating from an
/// item steps through the item's target. A null target on the way fails
/// with [`AddressingError::NullTarget`].
#[derive(Debug, Clone)]
pub struct DynamicNode<'c> {
    container: &'c NodeContainer,
    node: NodeHandle,
    index: NodeIndex,
}

impl<'c> DynamicNode<'c> {
    /// Start navigating at `node`
    pub fn new(container: &'c NodeContainer, node: NodeHandle) -> Self {
        Self {
            container,
            node,
            index: NodeIndex::Empty,
        }
    }

    /// Node addressed by this step, or the owner of the addressed item
    pub fn node(&self) -> NodeHandle {
        self.node
    }

    /// Item index; empty when the node itself is addressed
    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    /// Take one navigation step
    pub fn get(&self, accessor: impl Into<Accessor>) -> Result<DynamicNode<'c>> {
        let object = self.object()?;
        match accessor.into() {
            Accessor::Member(name) => Ok(Self::new(self.container, self.container.member(object, &name)?)),
            Accessor::Index(index) => Ok(Self {
                container: self.container,
                node: object,
                index,
            }),
        }
    }

    /// Step to a member
    pub fn member(&self, name: &str) -> Result<DynamicNode<'c>> {
        self.get(name)
    }

    /// Step to an item
    pub fn item(&self, index: impl Into<NodeIndex>) -> Result<DynamicNode<'c>> {
        self.get(Accessor::Index(index.into()))
    }

    /// Read the addressed value
    pub fn retrieve(&self) -> Result<Value> {
        self.container.retrieve_at(self.node, &self.index)
    }

    /// Write the addressed value
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.container.update_at(self.node, value, &self.index)
    }

    /// Object node further steps start from
    fn object(&self) -> Result<NodeHandle> {
        let target = if !self.index.is_empty() {
            self.container.indexed_target(self.node, &self.index)?
        } else if self.container.kind(self.node)? == NodeKind::Member {
            self.container.target(self.node)?
        } else {
            return Ok(self.node);
        };
        match target {
            Some(target) => Ok(target),
            None => Err(AddressingError::NullTarget(self.container.node_id(self.node)?).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::test_support::*;
    use ordoplay_editor_reflect::ObjectRef;

    fn p(child: Option<ObjectRef>) -> ObjectRef {
        ObjectRef::object(
            "P",
            [
                ("Name", Value::from("p")),
                ("Tags", ObjectRef::list("List<string>", ["a".into(), "b".into()]).into()),
                ("Child", Value::from(child)),
            ],
        )
    }

    #[test]
    fn test_members_and_items() {
        let container = container();
        let child = ObjectRef::object("Q", [("Value", Value::Int(1))]);
        let instance = p(Some(child.clone()));
        let root = DynamicNode::new(&container, container.get_or_create_node(&instance.clone().into()).unwrap());

        assert_eq!(root.member("Name").unwrap().retrieve().unwrap(), Value::from("p"));
        let tag = root.member("Tags").unwrap().item(NodeIndex::new(1)).unwrap();
        assert_eq!(tag.index(), &NodeIndex::new(1));
        assert_eq!(tag.retrieve().unwrap(), Value::from("b"));

        tag.set("c").unwrap();
        assert_eq!(instance.field("Tags").unwrap().as_object().unwrap().item(1).unwrap(), Value::from("c"));

        let value = root.get("Child").unwrap().get("Value").unwrap();
        value.set(5).unwrap();
        assert_eq!(child.field("Value").unwrap(), Value::Int(5));
        assert_eq!(value.node(), container.member(container.get_node(&child.into()).unwrap(), "Value").unwrap());
    }

    #[test]
    fn test_null_target() {
        let container = container();
        let instance = p(None);
        let root = DynamicNode::new(&container, container.get_or_create_node(&instance.clone().into()).unwrap());

        let child = root.member("Child").unwrap();
        assert_eq!(child.retrieve().unwrap(), Value::Null);
        assert!(matches!(
            child.member("Value"),
            Err(GraphError::Addressing(AddressingError::NullTarget(_)))
        ));

        child.set(ObjectRef::object("Q", [("Value", Value::Int(7))])).unwrap();
        assert_eq!(child.member("Value").unwrap().retrieve().unwrap(), Value::Int(7));
    }

    #[test]
    fn test_missing_member() {
        let container = container();
        let instance = p(None);
        let root = DynamicNode::new(&container, container.get_or_create_node(&instance.clone().into()).unwrap());
        assert!(matches!(
            root.member("Missing"),
            Err(GraphError::Addressing(AddressingError::MemberNotFound { .. }))
        ));
    }

    #[test]
    fn test_items_of_objects() {
        let container = container();
        let first = simple_class(1, None);
        let list = ObjectRef::list("List<SimpleClass>", [first.clone().into(), Value::Null]);
        let root = DynamicNode::new(&container, container.get_or_create_node(&list.clone().into()).unwrap());

        root.item(NodeIndex::new(0)).unwrap().member("Member1").unwrap().set(4).unwrap();
        assert_eq!(first.field("Member1").unwrap(), Value::Int(4));
        assert!(matches!(
            root.item(NodeIndex::new(1)).unwrap().member("Member1"),
            Err(GraphError::Addressing(AddressingError::NullTarget(_)))
        ));
    }
}
