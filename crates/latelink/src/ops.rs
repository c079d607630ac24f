//! Operation and call-descriptor model.
//!
//! Pure value types: no behavior beyond construction and equality. A
//! [`CallDescriptor`] is built once per call site and stays immutable for
//! the site's lifetime.

use std::sync::Arc;

use crate::value::Value;

/// The fixed set of dynamic operations a call site can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardOperation {
    /// Read a named property off the receiver
    GetProperty,
    /// Write a named property on the receiver
    SetProperty,
    /// Read an indexed element of an ordered container
    GetElement,
    /// Write an indexed element of an ordered container
    SetElement,
    /// Query the live length of an ordered container
    GetLength,
    /// Obtain a first-class handle to a named method group
    GetMethod,
    /// Resolve and invoke a named method in one step
    CallMethod,
    /// Invoke a previously obtained method handle
    Call,
    /// Construct a new instance from a type token
    New,
}

/// An operation paired with an operand name fixed at link time.
///
/// Compares and hashes by `(base, name)`. Used wherever a literal property
/// or method name is known when the call site is created; operations without
/// a fixed name carry the name as a runtime argument instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedOperation {
    base: StandardOperation,
    name: Arc<str>,
}

impl NamedOperation {
    /// Pair an operation with a fixed operand name.
    pub fn new(base: StandardOperation, name: impl Into<Arc<str>>) -> Self {
        Self { base, name: name.into() }
    }

    /// The underlying operation.
    pub fn base(&self) -> StandardOperation {
        self.base
    }

    /// The fixed operand name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A requested action: either a bare operation or one with a fixed name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Operand name (if any) supplied as a runtime argument
    Standard(StandardOperation),
    /// Operand name fixed at link time
    Named(NamedOperation),
}

impl Operation {
    /// Shorthand for `Operation::Named(NamedOperation::new(base, name))`.
    pub fn named(base: StandardOperation, name: impl Into<Arc<str>>) -> Self {
        Operation::Named(NamedOperation::new(base, name))
    }

    /// The underlying operation tag, named or not.
    pub fn base(&self) -> StandardOperation {
        match self {
            Operation::Standard(op) => *op,
            Operation::Named(named) => named.base(),
        }
    }

    /// The link-time operand name, when one is fixed.
    pub fn fixed_name(&self) -> Option<&str> {
        match self {
            Operation::Standard(_) => None,
            Operation::Named(named) => Some(named.name()),
        }
    }
}

impl From<StandardOperation> for Operation {
    fn from(op: StandardOperation) -> Self {
        Operation::Standard(op)
    }
}

/// Member resolution visibility for a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Only publicly visible members resolve; security denials present as
    /// the lighter "inaccessible member" failure
    Public,
    /// All declared members resolve, but host policy still applies to
    /// sensitive members and denials present as explicit security failures
    Full,
}

/// Semantic type of a descriptor parameter, return slot, or method signature
/// entry.
///
/// Drives overload matching: an exact tag match costs 0, `Int` widens to
/// `Float` at cost 1, `Null` matches any reference shape at cost 1, and an
/// `Any` parameter accepts everything at cost 2. Lowest total cost wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Unconstrained; accepts any value
    Any,
    /// No value (return slot of a void method)
    Void,
    /// The null value
    Null,
    /// Boolean
    Bool,
    /// 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// String
    Str,
    /// Fixed-size array
    Array,
    /// Resizable list-like container
    List,
    /// Class instance
    Object,
    /// Type token
    Class,
    /// Static namespace token
    StaticNamespace,
    /// First-class method handle
    Method,
}

impl TypeTag {
    /// The tag describing a runtime value's shape.
    pub fn of(value: &Value) -> TypeTag {
        match value {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::Str,
            Value::Array(_) => TypeTag::Array,
            Value::List(_) => TypeTag::List,
            Value::Object(_) => TypeTag::Object,
            Value::Class(_) => TypeTag::Class,
            Value::StaticNamespace(_) => TypeTag::StaticNamespace,
            Value::Method(_) => TypeTag::Method,
        }
    }

    /// Whether the tag pins down a concrete shape (everything but `Any`).
    pub fn is_concrete(self) -> bool {
        !matches!(self, TypeTag::Any)
    }

    /// Widening cost of passing an argument of tag `arg` to a parameter of
    /// this tag, or `None` when the argument is not applicable.
    pub(crate) fn accepts(self, arg: TypeTag) -> Option<u32> {
        if self == arg {
            return Some(0);
        }
        match (self, arg) {
            (TypeTag::Any, _) => Some(2),
            (TypeTag::Float, TypeTag::Int) => Some(1),
            // Null flows into any reference-shaped parameter.
            (
                TypeTag::Str
                | TypeTag::Array
                | TypeTag::List
                | TypeTag::Object
                | TypeTag::Class
                | TypeTag::StaticNamespace
                | TypeTag::Method,
                TypeTag::Null,
            ) => Some(1),
            _ => None,
        }
    }
}

/// Immutable per-call-site record: access mode, operation, and the semantic
/// parameter/return signature of the call.
///
/// `param_types[0]` describes the receiver; the remaining entries describe
/// the call arguments in order. Equality is by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallDescriptor {
    access_mode: AccessMode,
    operation: Operation,
    param_types: Vec<TypeTag>,
    return_type: TypeTag,
}

impl CallDescriptor {
    /// Create a descriptor for one call site.
    pub fn new(
        access_mode: AccessMode,
        operation: impl Into<Operation>,
        param_types: Vec<TypeTag>,
        return_type: TypeTag,
    ) -> Self {
        Self { access_mode, operation: operation.into(), param_types, return_type }
    }

    /// The site's member resolution visibility.
    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    /// The requested operation.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Semantic parameter types, receiver first.
    pub fn param_types(&self) -> &[TypeTag] {
        &self.param_types
    }

    /// Semantic argument types (parameter types minus the receiver slot).
    pub fn arg_types(&self) -> &[TypeTag] {
        if self.param_types.is_empty() {
            &[]
        } else {
            &self.param_types[1..]
        }
    }

    /// Semantic return type.
    pub fn return_type(&self) -> TypeTag {
        self.return_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_operation_equality_is_by_base_and_name() {
        let a = NamedOperation::new(StandardOperation::GetProperty, "color");
        let b = NamedOperation::new(StandardOperation::GetProperty, "color");
        let c = NamedOperation::new(StandardOperation::GetProperty, "size");
        let d = NamedOperation::new(StandardOperation::SetProperty, "color");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn descriptor_value_equality() {
        let mk = || {
            CallDescriptor::new(
                AccessMode::Public,
                Operation::named(StandardOperation::GetProperty, "x"),
                vec![TypeTag::Object],
                TypeTag::Any,
            )
        };
        assert_eq!(mk(), mk());

        let other = CallDescriptor::new(
            AccessMode::Full,
            Operation::named(StandardOperation::GetProperty, "x"),
            vec![TypeTag::Object],
            TypeTag::Any,
        );
        assert_ne!(mk(), other);
    }

    #[test]
    fn widening_costs() {
        assert_eq!(TypeTag::Int.accepts(TypeTag::Int), Some(0));
        assert_eq!(TypeTag::Float.accepts(TypeTag::Int), Some(1));
        assert_eq!(TypeTag::Int.accepts(TypeTag::Float), None);
        assert_eq!(TypeTag::Any.accepts(TypeTag::Str), Some(2));
        assert_eq!(TypeTag::Object.accepts(TypeTag::Null), Some(1));
        assert_eq!(TypeTag::Bool.accepts(TypeTag::Null), None);
    }

    #[test]
    fn arg_types_skip_receiver_slot() {
        let desc = CallDescriptor::new(
            AccessMode::Public,
            StandardOperation::GetElement,
            vec![TypeTag::Array, TypeTag::Int],
            TypeTag::Any,
        );
        assert_eq!(desc.arg_types(), &[TypeTag::Int]);
    }
}
