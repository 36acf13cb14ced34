// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of type descriptors.

use crate::descriptor::{TypeDescriptor, TypeDescriptorProvider, TypeName, TypeShape};
use crate::error::{ReflectError, Result};
use crate::value::{InstanceData, ObjectRef, StructValue, Value};
use indexmap::IndexMap;

/// Registry of known types
///
/// The built-in primitives (`bool`, `int`, `float`, `string`) and the
/// polymorphic `object` type are always registered.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    /// Registered descriptors by name
    types: IndexMap<TypeName, TypeDescriptor>,
}

impl TypeRegistry {
    /// Create a registry holding only the built-in types
    pub fn new() -> Self {
        let mut registry = Self {
            types: IndexMap::new(),
        };
        for primitive in [TypeName::BOOL, TypeName::INT, TypeName::FLOAT, TypeName::STRING] {
            registry.register(TypeDescriptor::primitive(primitive));
        }
        registry.register(TypeDescriptor {
            name: TypeName::OBJECT,
            shape: TypeShape::Any,
        });
        registry
    }

    /// Register a type, replacing any previous descriptor with the same name
    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    /// Get a type by name
    pub fn get(&self, name: &TypeName) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// Check whether a type is registered
    pub fn contains(&self, name: &TypeName) -> bool {
        self.types.contains_key(name)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Default value for a slot of the given type
    ///
    /// Primitives get their zero value, structs get a struct of defaults and
    /// every reference type gets null.
    pub fn default_value(&self, name: &TypeName) -> Result<Value> {
        self.default_value_guarded(name, &mut Vec::new())
    }

    fn default_value_guarded(&self, name: &TypeName, stack: &mut Vec<TypeName>) -> Result<Value> {
        let descriptor = self.require(name)?;
        Ok(match &descriptor.shape {
            TypeShape::Primitive => match name.as_str() {
                "bool" => Value::Bool(false),
                "int" => Value::Int(0),
                "float" => Value::Float(0.0),
                "string" => Value::String(String::new()),
                _ => Value::Null,
            },
            TypeShape::Struct { .. } => {
                // a struct that contains itself by value has no finite default
                if stack.contains(name) {
                    return Err(ReflectError::WrongShape {
                        type_name: name.clone(),
                        expected: "finite value type",
                    });
                }
                stack.push(name.clone());
                let mut value = StructValue::new(name.clone());
                for member in self.members_of(name) {
                    let default = self.default_value_guarded(&member.type_name, stack)?;
                    value = value.with_field(member.name, default);
                }
                stack.pop();
                Value::Struct(value)
            }
            _ => Value::Null,
        })
    }

    /// Create an instance of a reference type filled with default values
    pub fn new_object(&self, name: &TypeName) -> Result<ObjectRef> {
        let descriptor = self.require(name)?;
        let data = match &descriptor.shape {
            TypeShape::Object { .. } => {
                let mut fields = IndexMap::new();
                for member in self.members_of(name) {
                    fields.insert(member.name, self.default_value(&member.type_name)?);
                }
                InstanceData::Fields(fields)
            }
            TypeShape::Collection { .. } => InstanceData::List(Vec::new()),
            TypeShape::Dictionary { .. } => InstanceData::Dictionary(IndexMap::new()),
            _ => {
                return Err(ReflectError::WrongShape {
                    type_name: name.clone(),
                    expected: "reference type",
                })
            }
        };
        Ok(ObjectRef::new(name.clone(), data))
    }

    /// Create a struct value filled with default values
    pub fn new_struct(&self, name: &TypeName) -> Result<StructValue> {
        match self.default_value(name)? {
            Value::Struct(value) => Ok(value),
            _ => Err(ReflectError::WrongShape {
                type_name: name.clone(),
                expected: "value type",
            }),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDescriptorProvider for TypeRegistry {
    fn descriptor(&self, type_name: &TypeName) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.types().count(), 5);
        assert!(registry.contains(&TypeName::STRING));
        assert_eq!(registry.get(&TypeName::OBJECT).map(|d| &d.shape), Some(&TypeShape::Any));
    }

    #[test]
    fn test_new_object_defaults() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDescriptor::structure("Vec2").with_member("X", TypeName::FLOAT));
        registry.register(
            TypeDescriptor::object("Body")
                .with_member("Mass", TypeName::FLOAT)
                .with_member("Offset", "Vec2")
                .with_member("Next", "Body"),
        );

        let body = registry.new_object(&"Body".into()).unwrap();
        assert_eq!(body.field("Mass").unwrap(), Value::Float(0.0));
        assert_eq!(body.field("Next").unwrap(), Value::Null);
        let offset = body.field("Offset").unwrap();
        assert_eq!(offset.as_struct().unwrap().field("X").unwrap(), &Value::Float(0.0));
    }

    #[test]
    fn test_recursive_struct_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDescriptor::structure("Loop").with_member("Inner", "Loop"));
        assert!(registry.new_struct(&"Loop".into()).is_err());
    }

    #[test]
    fn test_unknown_type() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.new_object(&"Missing".into()).unwrap_err(),
            ReflectError::UnknownType("Missing".into())
        );
    }
}
