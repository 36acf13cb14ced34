// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type descriptors and dynamic values for the `OrdoPlay` Editor object model.
//!
//! The editor models arbitrary asset data as graphs of nodes. This crate is the
//! layer underneath that model: it says what a type looks like and stores the
//! values themselves.
//!
//! ## Architecture
//!
//! - [`Value`] is a dynamically typed value. Structs are copied by value,
//!   objects (plain objects, lists and dictionaries) are shared by reference
//!   through [`ObjectRef`].
//! - [`TypeDescriptor`] describes the shape of a type: primitive, plain object,
//!   struct, collection or dictionary.
//! - [`TypeDescriptorProvider`] answers shape questions for the node model and
//!   [`TypeRegistry`] is the stock implementation.

pub mod descriptor;
pub mod error;
pub mod registry;
pub mod value;

pub use descriptor::{MemberDescriptor, TypeDescriptor, TypeDescriptorProvider, TypeName, TypeShape};
pub use error::{ReflectError, Result};
pub use registry::TypeRegistry;
pub use value::{Instance, InstanceData, Key, ObjectKey, ObjectRef, StructValue, Value, WeakObjectRef};
