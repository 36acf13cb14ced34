// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised by value access and type lookups.

use crate::descriptor::TypeName;
use crate::value::Key;
use thiserror::Error;

/// Error when reading or writing dynamic values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReflectError {
    /// Type is not registered with the provider
    #[error("Unknown type: {0}")]
    UnknownType(TypeName),

    /// Member does not exist on the value
    #[error("No member '{member}' on {type_name}")]
    NoSuchMember {
        /// Type that was accessed
        type_name: TypeName,
        /// Requested member name
        member: String,
    },

    /// Collection index outside the live range
    #[error("Index {index} out of range for {type_name} (length {len})")]
    IndexOutOfRange {
        /// Collection type
        type_name: TypeName,
        /// Requested position
        index: usize,
        /// Current length
        len: usize,
    },

    /// Dictionary key is absent
    #[error("Key {key} not found in {type_name}")]
    KeyNotFound {
        /// Dictionary type
        type_name: TypeName,
        /// Requested key
        key: Key,
    },

    /// Dictionary key already present on insert
    #[error("Key {key} already present in {type_name}")]
    DuplicateKey {
        /// Dictionary type
        type_name: TypeName,
        /// Inserted key
        key: Key,
    },

    /// Operation does not apply to the value's shape
    #[error("{type_name} is not a {expected}")]
    WrongShape {
        /// Type that was accessed
        type_name: TypeName,
        /// Shape the operation required
        expected: &'static str,
    },

    /// Value is not assignable to the declared type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared type
        expected: TypeName,
        /// Runtime type of the offered value
        found: TypeName,
    },

    /// Value cannot be used as a dictionary key
    #[error("Value of type {0} cannot be used as a dictionary key")]
    InvalidKey(TypeName),
}

/// Result type for value access
pub type Result<T> = std::result::Result<T, ReflectError>;
