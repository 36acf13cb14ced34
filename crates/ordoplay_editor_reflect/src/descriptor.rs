// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type names, type shapes and the descriptor provider contract.

use crate::error::{ReflectError, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

/// Name of a type known to a descriptor provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(Cow<'static, str>);

impl TypeName {
    /// Boolean primitive
    pub const BOOL: TypeName = TypeName(Cow::Borrowed("bool"));
    /// Integer primitive
    pub const INT: TypeName = TypeName(Cow::Borrowed("int"));
    /// Float primitive
    pub const FLOAT: TypeName = TypeName(Cow::Borrowed("float"));
    /// String primitive
    pub const STRING: TypeName = TypeName(Cow::Borrowed("string"));
    /// Polymorphic type accepting any value
    pub const OBJECT: TypeName = TypeName(Cow::Borrowed("object"));

    /// Create a type name
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TypeName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&TypeName> for TypeName {
    fn from(value: &TypeName) -> Self {
        value.clone()
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named member slot of an object or struct type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    /// Member name, unique within the type
    pub name: String,
    /// Declared member type
    pub type_name: TypeName,
}

impl MemberDescriptor {
    /// Create a member descriptor
    pub fn new(name: impl Into<String>, type_name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Structural category of a type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    /// Opaque leaf, never decomposed
    Primitive,
    /// Polymorphic slot, the runtime value decides the shape
    Any,
    /// Reference type with named members
    Object {
        /// Base type whose members come first
        base: Option<TypeName>,
        /// Members declared on this type
        members: Vec<MemberDescriptor>,
    },
    /// Value type with named members
    Struct {
        /// Members in declaration order
        members: Vec<MemberDescriptor>,
    },
    /// Reference type holding ordered items
    Collection {
        /// Declared item type
        element: TypeName,
        /// Whether items can be read and written by position
        indexable: bool,
    },
    /// Reference type holding keyed entries
    Dictionary {
        /// Declared key type
        key: TypeName,
        /// Declared value type
        value: TypeName,
    },
}

/// Descriptor of a single type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Type name
    pub name: TypeName,
    /// Type shape
    pub shape: TypeShape,
}

impl TypeDescriptor {
    /// Describe a primitive type
    pub fn primitive(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            shape: TypeShape::Primitive,
        }
    }

    /// Describe a reference type with members
    pub fn object(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            shape: TypeShape::Object {
                base: None,
                members: Vec::new(),
            },
        }
    }

    /// Describe a value type with members
    pub fn structure(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            shape: TypeShape::Struct { members: Vec::new() },
        }
    }

    /// Describe an indexable collection
    pub fn list(name: impl Into<TypeName>, element: impl Into<TypeName>) -> Self {
        Self::collection(name, element, true)
    }

    /// Describe a collection, indexable or not
    pub fn collection(name: impl Into<TypeName>, element: impl Into<TypeName>, indexable: bool) -> Self {
        Self {
            name: name.into(),
            shape: TypeShape::Collection {
                element: element.into(),
                indexable,
            },
        }
    }

    /// Describe a dictionary
    pub fn dictionary(
        name: impl Into<TypeName>,
        key: impl Into<TypeName>,
        value: impl Into<TypeName>,
    ) -> Self {
        Self {
            name: name.into(),
            shape: TypeShape::Dictionary {
                key: key.into(),
                value: value.into(),
            },
        }
    }

    /// Add a member (objects and structs only)
    pub fn with_member(mut self, name: impl Into<String>, type_name: impl Into<TypeName>) -> Self {
        match &mut self.shape {
            TypeShape::Object { members, .. } | TypeShape::Struct { members } => {
                members.push(MemberDescriptor::new(name, type_name));
            }
            _ => debug_assert!(false, "{} cannot declare members", self.name),
        }
        self
    }

    /// Set the base type (objects only)
    pub fn extends(mut self, base_type: impl Into<TypeName>) -> Self {
        if let TypeShape::Object { base, .. } = &mut self.shape {
            *base = Some(base_type.into());
        } else {
            debug_assert!(false, "{} cannot have a base type", self.name);
        }
        self
    }

    /// Members declared directly on this type
    pub fn declared_members(&self) -> &[MemberDescriptor] {
        match &self.shape {
            TypeShape::Object { members, .. } | TypeShape::Struct { members } => members,
            _ => &[],
        }
    }

    /// Check for a leaf type
    pub fn is_primitive(&self) -> bool {
        matches!(self.shape, TypeShape::Primitive)
    }

    /// Check for copy semantics
    pub fn is_value_type(&self) -> bool {
        matches!(self.shape, TypeShape::Struct { .. })
    }

    /// Check whether a null value fits this type
    pub fn is_nullable(&self) -> bool {
        matches!(
            self.shape,
            TypeShape::Any
                | TypeShape::Object { .. }
                | TypeShape::Collection { .. }
                | TypeShape::Dictionary { .. }
        )
    }
}

/// Answers shape questions about types
///
/// Only [`descriptor`](Self::descriptor) is required; every other query is
/// derived from it.
pub trait TypeDescriptorProvider: Send + Sync {
    /// Look up the descriptor of a type
    fn descriptor(&self, type_name: &TypeName) -> Option<&TypeDescriptor>;

    /// Look up a descriptor, failing for unknown types
    fn require(&self, type_name: &TypeName) -> Result<&TypeDescriptor> {
        self.descriptor(type_name)
            .ok_or_else(|| ReflectError::UnknownType(type_name.clone()))
    }

    /// Check for a leaf type
    fn is_primitive(&self, type_name: &TypeName) -> bool {
        self.descriptor(type_name).is_some_and(TypeDescriptor::is_primitive)
    }

    /// Check for copy semantics
    fn is_value_type(&self, type_name: &TypeName) -> bool {
        self.descriptor(type_name).is_some_and(TypeDescriptor::is_value_type)
    }

    /// All members of a type, base type members first
    fn members_of(&self, type_name: &TypeName) -> Vec<MemberDescriptor> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.descriptor(type_name);
        while let Some(descriptor) = current {
            if !seen.insert(descriptor.name.clone()) {
                break;
            }
            chain.push(descriptor);
            current = match &descriptor.shape {
                TypeShape::Object { base: Some(base), .. } => self.descriptor(base),
                _ => None,
            };
        }
        chain
            .iter()
            .rev()
            .flat_map(|d| d.declared_members().iter().cloned())
            .collect()
    }

    /// Check for a collection type
    fn is_collection(&self, type_name: &TypeName) -> bool {
        self.descriptor(type_name)
            .is_some_and(|d| matches!(d.shape, TypeShape::Collection { .. }))
    }

    /// Declared item type of a collection
    fn element_type(&self, type_name: &TypeName) -> Option<TypeName> {
        match &self.descriptor(type_name)?.shape {
            TypeShape::Collection { element, .. } => Some(element.clone()),
            _ => None,
        }
    }

    /// Check whether items can be read and written by position
    fn supports_index_get_set(&self, type_name: &TypeName) -> bool {
        self.descriptor(type_name)
            .is_some_and(|d| matches!(d.shape, TypeShape::Collection { indexable: true, .. }))
    }

    /// Check for a dictionary type
    fn is_dictionary(&self, type_name: &TypeName) -> bool {
        self.descriptor(type_name)
            .is_some_and(|d| matches!(d.shape, TypeShape::Dictionary { .. }))
    }

    /// Declared key type of a dictionary
    fn key_type(&self, type_name: &TypeName) -> Option<TypeName> {
        match &self.descriptor(type_name)?.shape {
            TypeShape::Dictionary { key, .. } => Some(key.clone()),
            _ => None,
        }
    }

    /// Declared value type of a dictionary
    fn value_type(&self, type_name: &TypeName) -> Option<TypeName> {
        match &self.descriptor(type_name)?.shape {
            TypeShape::Dictionary { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    /// Check whether `type_name` is `base` or inherits from it
    fn derives_from(&self, type_name: &TypeName, base: &TypeName) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(type_name.clone());
        while let Some(name) = current {
            if &name == base {
                return true;
            }
            if !seen.insert(name.clone()) {
                return false;
            }
            current = match self.descriptor(&name).map(|d| &d.shape) {
                Some(TypeShape::Object { base, .. }) => base.clone(),
                _ => None,
            };
        }
        false
    }

    /// Check whether a value may be stored in a slot of the declared type
    fn is_assignable(&self, declared: &TypeName, value: &Value) -> bool {
        let Some(descriptor) = self.descriptor(declared) else {
            return false;
        };
        if matches!(descriptor.shape, TypeShape::Any) {
            return true;
        }
        match value.type_name() {
            None => descriptor.is_nullable(),
            Some(runtime) => self.derives_from(&runtime, declared),
        }
    }
}
