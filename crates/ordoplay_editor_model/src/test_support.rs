// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared fixtures for unit tests.

use crate::container::NodeContainer;
use ordoplay_editor_reflect::{ObjectRef, StructValue, TypeDescriptor, TypeName, TypeRegistry, Value};
use std::sync::Arc;

pub(crate) fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register(
        TypeDescriptor::object("SimpleClass")
            .with_member("Member1", TypeName::INT)
            .with_member("Member2", "SimpleClass"),
    );
    registry.register(
        TypeDescriptor::structure("Struct")
            .with_member("Member1", TypeName::STRING)
            .with_member("Member2", "SimpleClass"),
    );
    registry.register(TypeDescriptor::object("ObjectWithStruct").with_member("Member1", "Struct"));
    registry.register(TypeDescriptor::object("AnyHolder").with_member("Value", TypeName::OBJECT));
    registry.register(
        TypeDescriptor::object("BadHolder").with_member("Dict", "Dictionary<SimpleClass,int>"),
    );
    registry.register(
        TypeDescriptor::object("P")
            .with_member("Name", TypeName::STRING)
            .with_member("Tags", "List<string>")
            .with_member("Child", "Q"),
    );
    registry.register(TypeDescriptor::object("Q").with_member("Value", TypeName::INT));
    registry.register(
        TypeDescriptor::object("ComplexClass")
            .with_member("Member1", TypeName::STRING)
            .with_member("Member2", TypeName::OBJECT)
            .with_member("Member3", "Struct")
            .with_member("Member4", "Struct")
            .with_member("Member5", "List<string>")
            .with_member("Member6", "List<SimpleClass>")
            .with_member("Member7", "List<Struct>"),
    );
    registry.register(TypeDescriptor::list("List<string>", TypeName::STRING));
    registry.register(TypeDescriptor::list("List<SimpleClass>", "SimpleClass"));
    registry.register(TypeDescriptor::list("List<object>", TypeName::OBJECT));
    registry.register(TypeDescriptor::list("List<Struct>", "Struct"));
    registry.register(TypeDescriptor::collection("HashSet<SimpleClass>", "SimpleClass", false));
    registry.register(TypeDescriptor::dictionary(
        "Dictionary<string,SimpleClass>",
        TypeName::STRING,
        "SimpleClass",
    ));
    registry.register(TypeDescriptor::dictionary(
        "Dictionary<SimpleClass,int>",
        "SimpleClass",
        TypeName::INT,
    ));
    registry
}

pub(crate) fn container() -> NodeContainer {
    NodeContainer::new(Arc::new(registry()))
}

pub(crate) fn simple_class(member1: i64, member2: Option<ObjectRef>) -> ObjectRef {
    ObjectRef::object(
        "SimpleClass",
        [("Member1", Value::Int(member1)), ("Member2", Value::from(member2))],
    )
}

pub(crate) fn struct_value(member1: &str, member2: Option<ObjectRef>) -> StructValue {
    StructValue::new("Struct")
        .with_field("Member1", member1)
        .with_field("Member2", member2)
}

pub(crate) fn object_with_struct(member1: &str, member2: Option<ObjectRef>) -> ObjectRef {
    ObjectRef::object(
        "ObjectWithStruct",
        [("Member1", Value::Struct(struct_value(member1, member2)))],
    )
}

pub(crate) fn complex_class() -> ObjectRef {
    ObjectRef::object(
        "ComplexClass",
        [
            ("Member1", Value::from("Test")),
            ("Member2", Value::Null),
            ("Member3", Value::Struct(struct_value("a", None))),
            ("Member4", Value::Struct(struct_value("b", None))),
            ("Member5", ObjectRef::list("List<string>", ["x".into(), "y".into()]).into()),
            ("Member6", ObjectRef::list("List<SimpleClass>", Vec::new()).into()),
            ("Member7", ObjectRef::list("List<Struct>", Vec::new()).into()),
        ],
    )
}
