//! Host value model.
//!
//! Receivers and arguments flow through the linker as [`Value`]s: primitives,
//! two ordered-container families (fixed arrays and resizable lists), class
//! instances, type tokens, static-namespace tokens, and first-class method
//! handles. Containers use interior mutability so a cached call-site target
//! observes live contents on every call.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::class::{ClassSpec, MethodSpec};

/// A dynamically typed host value.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Fixed-size ordered container
    Array(Arc<ArrayValue>),
    /// Resizable ordered container
    List(Arc<ListValue>),
    /// Class instance
    Object(Arc<ObjectValue>),
    /// Type token: a class used as a value
    Class(Arc<ClassSpec>),
    /// A class's static member namespace used as a receiver
    StaticNamespace(Arc<ClassSpec>),
    /// First-class method handle produced by `GET_METHOD`
    Method(Arc<MethodHandleValue>),
}

/// Receiver shape classification.
///
/// This predicate is the explicit boundary for which receivers count as
/// indexable: exactly `Array` and `List`. Supporting a new container family
/// means adding a shape here and an arm in the indexed adapter, not
/// inferring capabilities from member names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Null
    Null,
    /// Boolean
    Bool,
    /// Integer
    Int,
    /// Float
    Float,
    /// String
    Str,
    /// Fixed array
    Array,
    /// Resizable list
    List,
    /// Class instance
    Object,
    /// Type token
    Class,
    /// Static namespace token
    StaticNamespace,
    /// Method handle
    Method,
}

impl Value {
    /// Build a string value.
    pub fn str(s: impl Into<Arc<str>>) -> Value {
        Value::Str(s.into())
    }

    /// Build a fixed array from initial elements; its length never changes.
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Arc::new(ArrayValue::new(elements)))
    }

    /// Build a resizable list from initial elements.
    pub fn list(elements: Vec<Value>) -> Value {
        Value::List(Arc::new(ListValue::new(elements)))
    }

    /// Classify this value's receiver shape.
    pub fn shape(&self) -> ShapeKind {
        match self {
            Value::Null => ShapeKind::Null,
            Value::Bool(_) => ShapeKind::Bool,
            Value::Int(_) => ShapeKind::Int,
            Value::Float(_) => ShapeKind::Float,
            Value::Str(_) => ShapeKind::Str,
            Value::Array(_) => ShapeKind::Array,
            Value::List(_) => ShapeKind::List,
            Value::Object(_) => ShapeKind::Object,
            Value::Class(_) => ShapeKind::Class,
            Value::StaticNamespace(_) => ShapeKind::StaticNamespace,
            Value::Method(_) => ShapeKind::Method,
        }
    }

    /// Whether this value participates in the indexing protocol.
    pub fn is_indexable(&self) -> bool {
        matches!(self.shape(), ShapeKind::Array | ShapeKind::List)
    }

    /// Human-readable shape name for diagnostics.
    pub fn shape_name(&self) -> &'static str {
        match self.shape() {
            ShapeKind::Null => "null",
            ShapeKind::Bool => "bool",
            ShapeKind::Int => "int",
            ShapeKind::Float => "float",
            ShapeKind::Str => "string",
            ShapeKind::Array => "array",
            ShapeKind::List => "list",
            ShapeKind::Object => "object",
            ShapeKind::Class => "class",
            ShapeKind::StaticNamespace => "static namespace",
            ShapeKind::Method => "method handle",
        }
    }

    /// Integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Instance payload, if this is an `Object`.
    pub fn as_object(&self) -> Option<&Arc<ObjectValue>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => a.id() == b.id(),
            (Value::StaticNamespace(a), Value::StaticNamespace(b)) => a.id() == b.id(),
            (Value::Method(a), Value::Method(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Fixed-size ordered container: elements are mutable, length is not.
#[derive(Debug)]
pub struct ArrayValue {
    elements: RwLock<Box<[Value]>>,
}

impl ArrayValue {
    /// Freeze the given elements into a fixed array.
    pub fn new(elements: Vec<Value>) -> Self {
        Self { elements: RwLock::new(elements.into_boxed_slice()) }
    }

    /// The fixed element count.
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the element at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.elements.read().get(index).cloned()
    }

    /// Overwrite the element at `index`; false when out of range.
    pub fn set(&self, index: usize, value: Value) -> bool {
        let mut elements = self.elements.write();
        match elements.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Resizable ordered container.
#[derive(Debug, Default)]
pub struct ListValue {
    elements: RwLock<Vec<Value>>,
}

impl ListValue {
    /// Build a list from initial elements.
    pub fn new(elements: Vec<Value>) -> Self {
        Self { elements: RwLock::new(elements) }
    }

    /// The live element count.
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    /// Whether the list is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the element at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.elements.read().get(index).cloned()
    }

    /// Overwrite the element at `index`; false when out of range.
    pub fn set(&self, index: usize, value: Value) -> bool {
        let mut elements = self.elements.write();
        match elements.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Append an element.
    pub fn push(&self, value: Value) {
        self.elements.write().push(value);
    }

    /// Remove all elements.
    pub fn clear(&self) {
        self.elements.write().clear();
    }
}

/// A class instance: a class reference plus slot-addressed field storage.
#[derive(Debug)]
pub struct ObjectValue {
    class: Arc<ClassSpec>,
    fields: RwLock<Vec<Value>>,
}

impl ObjectValue {
    /// Allocate an instance with all field slots initialized to null.
    pub fn new(class: Arc<ClassSpec>) -> Self {
        let slots = class.field_slot_count();
        Self { class, fields: RwLock::new(vec![Value::Null; slots]) }
    }

    /// The instance's class.
    pub fn class(&self) -> &Arc<ClassSpec> {
        &self.class
    }

    /// Read a field slot.
    pub fn get_slot(&self, slot: usize) -> Option<Value> {
        self.fields.read().get(slot).cloned()
    }

    /// Write a field slot; false when the slot does not exist.
    pub fn set_slot(&self, slot: usize, value: Value) -> bool {
        let mut fields = self.fields.write();
        match fields.get_mut(slot) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }
}

/// What a method handle needs by way of a receiver at invocation time.
#[derive(Debug, Clone)]
pub enum MethodReceiver {
    /// An instance of the originating class must be supplied as the first
    /// actual argument
    Instance(Arc<ClassSpec>),
    /// No instance required; the first actual argument is ignored
    Static(Arc<ClassSpec>),
}

/// First-class result of `GET_METHOD`: a named overload group whose actual
/// overload is chosen only when the handle is invoked through `CALL`.
#[derive(Debug)]
pub struct MethodHandleValue {
    name: Arc<str>,
    overloads: Vec<Arc<MethodSpec>>,
    receiver: MethodReceiver,
}

impl MethodHandleValue {
    pub(crate) fn new(
        name: Arc<str>,
        overloads: Vec<Arc<MethodSpec>>,
        receiver: MethodReceiver,
    ) -> Self {
        Self { name, overloads, receiver }
    }

    /// The method name this handle was resolved for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The accessible overloads captured at resolution time.
    pub fn overloads(&self) -> &[Arc<MethodSpec>] {
        &self.overloads
    }

    /// The handle's receiver requirement.
    pub fn receiver(&self) -> &MethodReceiver {
        &self.receiver
    }
}
