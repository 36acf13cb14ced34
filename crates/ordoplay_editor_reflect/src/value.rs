// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dynamic values, shared object instances and dictionary keys.

use crate::descriptor::TypeName;
use crate::error::{ReflectError, Result};
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// A dynamically typed value
///
/// Primitives and structs have copy semantics. Objects are shared: cloning a
/// `Value::Object` clones the handle, not the instance, and equality compares
/// identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    String(String),
    /// Value-type instance
    Struct(StructValue),
    /// Reference-type instance (object, list or dictionary)
    Object(ObjectRef),
}

impl Value {
    /// Runtime type of this value, `None` for null
    pub fn type_name(&self) -> Option<TypeName> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(TypeName::BOOL),
            Self::Int(_) => Some(TypeName::INT),
            Self::Float(_) => Some(TypeName::FLOAT),
            Self::String(_) => Some(TypeName::STRING),
            Self::Struct(s) => Some(s.type_name().clone()),
            Self::Object(o) => Some(o.type_name()),
        }
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check for a leaf value the model never decomposes
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_))
    }

    /// Get the object handle, if this is an object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the struct, if this is a struct
    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer, if this is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float, if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the boolean, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the string slice, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<StructValue> for Value {
    fn from(value: StructValue) -> Self {
        Self::Struct(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}

impl From<Option<ObjectRef>> for Value {
    fn from(value: Option<ObjectRef>) -> Self {
        value.map_or(Self::Null, Self::Object)
    }
}

impl From<Key> for Value {
    fn from(value: Key) -> Self {
        match value {
            Key::Bool(b) => Self::Bool(b),
            Key::Int(i) => Self::Int(i),
            Key::Float(f) => Self::Float(f),
            Key::String(s) => Self::String(s),
        }
    }
}

/// A value-type instance: a named bag of fields copied on assignment
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    type_name: TypeName,
    fields: IndexMap<String, Value>,
}

impl StructValue {
    /// Create an empty struct value
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Add a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get the struct type
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Get a field value
    pub fn field(&self, name: &str) -> Result<&Value> {
        self.fields.get(name).ok_or_else(|| ReflectError::NoSuchMember {
            type_name: self.type_name.clone(),
            member: name.to_string(),
        })
    }

    /// Replace a field value, returning the previous one
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<Value> {
        match self.fields.get_mut(name) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(ReflectError::NoSuchMember {
                type_name: self.type_name.clone(),
                member: name.to_string(),
            }),
        }
    }

    /// Iterate fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Primitive dictionary key
///
/// Floats compare by total order so keys stay hashable and sortable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Key {
    /// Boolean key
    Bool(bool),
    /// Integer key
    Int(i64),
    /// Float key
    Float(f64),
    /// String key
    String(String),
}

impl Key {
    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::Float(_) => 2,
            Self::String(_) => 3,
        }
    }

    /// Type of the key
    pub fn type_name(&self) -> TypeName {
        match self {
            Self::Bool(_) => TypeName::BOOL,
            Self::Int(_) => TypeName::INT,
            Self::Float(_) => TypeName::FLOAT,
            Self::String(_) => TypeName::STRING,
        }
    }

    /// Convert a primitive value into a key
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Int(i) => Ok(Self::Int(*i)),
            Value::Float(f) => Ok(Self::Float(*f)),
            Value::String(s) => Ok(Self::String(s.clone())),
            other => Err(ReflectError::InvalidKey(
                other.type_name().unwrap_or(TypeName::OBJECT),
            )),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::String(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// Storage of a reference-type instance
#[derive(Debug)]
pub enum InstanceData {
    /// Plain object with named fields
    Fields(IndexMap<String, Value>),
    /// Indexable collection
    List(Vec<Value>),
    /// Ordered dictionary keyed by primitives
    Dictionary(IndexMap<Key, Value>),
}

/// A reference-type instance
#[derive(Debug)]
pub struct Instance {
    type_name: TypeName,
    data: InstanceData,
}

impl Instance {
    /// Create an instance
    pub fn new(type_name: impl Into<TypeName>, data: InstanceData) -> Self {
        Self {
            type_name: type_name.into(),
            data,
        }
    }

    /// Get the runtime type
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Get the raw storage
    pub fn data(&self) -> &InstanceData {
        &self.data
    }

    fn wrong_shape(&self, expected: &'static str) -> ReflectError {
        ReflectError::WrongShape {
            type_name: self.type_name.clone(),
            expected,
        }
    }

    fn no_member(&self, name: &str) -> ReflectError {
        ReflectError::NoSuchMember {
            type_name: self.type_name.clone(),
            member: name.to_string(),
        }
    }

    fn out_of_range(&self, index: usize, len: usize) -> ReflectError {
        ReflectError::IndexOutOfRange {
            type_name: self.type_name.clone(),
            index,
            len,
        }
    }

    fn missing_key(&self, key: &Key) -> ReflectError {
        ReflectError::KeyNotFound {
            type_name: self.type_name.clone(),
            key: key.clone(),
        }
    }

    /// Get a field value
    pub fn field(&self, name: &str) -> Result<&Value> {
        match &self.data {
            InstanceData::Fields(fields) => fields.get(name).ok_or_else(|| self.no_member(name)),
            _ => Err(self.wrong_shape("plain object")),
        }
    }

    /// Replace a field value, returning the previous one
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<Value> {
        let err = self.no_member(name);
        match &mut self.data {
            InstanceData::Fields(fields) => match fields.get_mut(name) {
                Some(slot) => Ok(std::mem::replace(slot, value)),
                None => Err(err),
            },
            _ => Err(self.wrong_shape("plain object")),
        }
    }

    /// Number of items or entries, zero for plain objects
    pub fn len(&self) -> usize {
        match &self.data {
            InstanceData::Fields(_) => 0,
            InstanceData::List(items) => items.len(),
            InstanceData::Dictionary(entries) => entries.len(),
        }
    }

    /// Check for an empty collection or dictionary
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a collection item
    pub fn item(&self, index: usize) -> Result<&Value> {
        match &self.data {
            InstanceData::List(items) => items
                .get(index)
                .ok_or_else(|| self.out_of_range(index, items.len())),
            _ => Err(self.wrong_shape("collection")),
        }
    }

    /// Replace a collection item, returning the previous one
    pub fn set_item(&mut self, index: usize, value: Value) -> Result<Value> {
        let len = self.len();
        let err = self.out_of_range(index, len);
        match &mut self.data {
            InstanceData::List(items) => match items.get_mut(index) {
                Some(slot) => Ok(std::mem::replace(slot, value)),
                None => Err(err),
            },
            _ => Err(self.wrong_shape("collection")),
        }
    }

    /// Insert a collection item; `index` may equal the length to append
    pub fn insert_item(&mut self, index: usize, value: Value) -> Result<()> {
        let len = self.len();
        let err = self.out_of_range(index, len);
        match &mut self.data {
            InstanceData::List(items) if index <= items.len() => {
                items.insert(index, value);
                Ok(())
            }
            InstanceData::List(_) => Err(err),
            _ => Err(self.wrong_shape("collection")),
        }
    }

    /// Remove a collection item
    pub fn remove_item(&mut self, index: usize) -> Result<Value> {
        let len = self.len();
        let err = self.out_of_range(index, len);
        match &mut self.data {
            InstanceData::List(items) if index < items.len() => Ok(items.remove(index)),
            InstanceData::List(_) => Err(err),
            _ => Err(self.wrong_shape("collection")),
        }
    }

    /// Snapshot of collection items
    pub fn items(&self) -> Result<Vec<Value>> {
        match &self.data {
            InstanceData::List(items) => Ok(items.clone()),
            _ => Err(self.wrong_shape("collection")),
        }
    }

    /// Get a dictionary entry
    pub fn entry(&self, key: &Key) -> Result<&Value> {
        match &self.data {
            InstanceData::Dictionary(entries) => entries.get(key).ok_or_else(|| self.missing_key(key)),
            _ => Err(self.wrong_shape("dictionary")),
        }
    }

    /// Replace an existing dictionary entry, returning the previous value
    pub fn set_entry(&mut self, key: &Key, value: Value) -> Result<Value> {
        let err = self.missing_key(key);
        match &mut self.data {
            InstanceData::Dictionary(entries) => match entries.get_mut(key) {
                Some(slot) => Ok(std::mem::replace(slot, value)),
                None => Err(err),
            },
            _ => Err(self.wrong_shape("dictionary")),
        }
    }

    /// Insert a new dictionary entry
    pub fn insert_entry(&mut self, key: Key, value: Value) -> Result<()> {
        let type_name = self.type_name.clone();
        match &mut self.data {
            InstanceData::Dictionary(entries) => {
                if entries.contains_key(&key) {
                    return Err(ReflectError::DuplicateKey { type_name, key });
                }
                entries.insert(key, value);
                Ok(())
            }
            _ => Err(self.wrong_shape("dictionary")),
        }
    }

    /// Remove a dictionary entry, keeping the order of the others
    pub fn remove_entry(&mut self, key: &Key) -> Result<Value> {
        let err = self.missing_key(key);
        match &mut self.data {
            InstanceData::Dictionary(entries) => entries.shift_remove(key).ok_or(err),
            _ => Err(self.wrong_shape("dictionary")),
        }
    }

    /// Snapshot of dictionary entries in order
    pub fn entries(&self) -> Result<Vec<(Key, Value)>> {
        match &self.data {
            InstanceData::Dictionary(entries) => Ok(entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            _ => Err(self.wrong_shape("dictionary")),
        }
    }
}

/// Address of an instance, stable while the instance is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(usize);

/// Shared handle to a reference-type instance
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Instance>>);

impl ObjectRef {
    /// Wrap a new instance
    pub fn new(type_name: impl Into<TypeName>, data: InstanceData) -> Self {
        Self(Arc::new(RwLock::new(Instance::new(type_name, data))))
    }

    /// Create a plain object from its fields
    pub fn object<N, I>(type_name: impl Into<TypeName>, fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Value)>,
    {
        let fields = fields.into_iter().map(|(n, v)| (n.into(), v)).collect();
        Self::new(type_name, InstanceData::Fields(fields))
    }

    /// Create a collection
    pub fn list(type_name: impl Into<TypeName>, items: impl IntoIterator<Item = Value>) -> Self {
        Self::new(type_name, InstanceData::List(items.into_iter().collect()))
    }

    /// Create a dictionary
    pub fn dictionary(
        type_name: impl Into<TypeName>,
        entries: impl IntoIterator<Item = (Key, Value)>,
    ) -> Self {
        Self::new(type_name, InstanceData::Dictionary(entries.into_iter().collect()))
    }

    /// Lock the instance for reading
    pub fn read(&self) -> RwLockReadGuard<'_, Instance> {
        self.0.read()
    }

    /// Lock the instance for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, Instance> {
        self.0.write()
    }

    /// Runtime type of the instance
    pub fn type_name(&self) -> TypeName {
        self.0.read().type_name().clone()
    }

    /// Identity key of the instance
    pub fn key(&self) -> ObjectKey {
        ObjectKey(Arc::as_ptr(&self.0) as *const () as usize)
    }

    /// Create a weak handle that does not keep the instance alive
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Read a field
    pub fn field(&self, name: &str) -> Result<Value> {
        self.read().field(name).cloned()
    }

    /// Write a field, returning the previous value
    pub fn set_field(&self, name: &str, value: impl Into<Value>) -> Result<Value> {
        self.write().set_field(name, value.into())
    }

    /// Read a collection item
    pub fn item(&self, index: usize) -> Result<Value> {
        self.read().item(index).cloned()
    }

    /// Read a dictionary entry
    pub fn entry(&self, key: &Key) -> Result<Value> {
        self.read().entry(key).cloned()
    }

    /// Number of items or entries
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check for an empty collection or dictionary
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    // Object graphs can be cyclic, so never descend into the instance
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Some(instance) => write!(f, "ObjectRef({}@{:#x})", instance.type_name(), self.key().0),
            None => write!(f, "ObjectRef(<locked>@{:#x})", self.key().0),
        }
    }
}

/// Weak handle to a reference-type instance
#[derive(Clone)]
pub struct WeakObjectRef(Weak<RwLock<Instance>>);

impl WeakObjectRef {
    /// Get a strong handle if the instance is still alive
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    /// Check whether the instance is still alive
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Identity key of the instance this handle was created from
    pub fn key(&self) -> ObjectKey {
        ObjectKey(self.0.as_ptr() as *const () as usize)
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakObjectRef({:#x}, alive: {})", self.key().0, self.is_alive())
    }
}
