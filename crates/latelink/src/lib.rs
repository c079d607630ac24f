//! Latelink — a guarded dynamic call-site linker.
//!
//! A caller that does not know the concrete type of a receiver at the point
//! of emission can still perform structured operations against it: read or
//! write a named or indexed property, query a length, invoke an instance or
//! static method by name, obtain a first-class method handle, or construct a
//! new instance. Resolution happens lazily on first use of each call site;
//! the resolved strategy is cached behind a guard and transparently
//! re-resolved when the values flowing through the site change shape.
//!
//! The moving parts:
//! - [`Operation`] / [`CallDescriptor`] — immutable description of what a
//!   call site wants to do
//! - [`Linker`] — stateless resolution engine producing a
//!   [`LinkedInvocation`] (target + guard) for concrete receiver shapes
//! - [`DynamicAccessPoint`] — the per-call-site cache cell that checks the
//!   guard on every use and relinks on a miss
//! - [`ClassSpec`] — per-type capability table (fields, accessors, method
//!   groups, constructors) consulted during resolution
//! - [`SecurityPolicy`] — host collaborator with the final say on sensitive
//!   members

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod access_point;
pub mod class;
pub mod guard;
pub mod linker;
pub mod ops;
pub mod policy;
pub mod value;

pub use access_point::DynamicAccessPoint;
pub use class::{
    AccessorDef, AccessorSpec, ClassBuilder, ClassId, ClassSpec, ConstructorSpec, CtorDef,
    FieldDef, FieldSpec, MemberKind, MethodDef, MethodSpec, Visibility,
};
pub use guard::Guard;
pub use linker::{LinkedInvocation, Linker, TargetFn};
pub use ops::{AccessMode, CallDescriptor, NamedOperation, Operation, StandardOperation, TypeTag};
pub use policy::{AllowAll, DenySensitive, MemberRef, SecurityPolicy, Verdict};
pub use value::{ArrayValue, ListValue, MethodHandleValue, MethodReceiver, ObjectValue, ShapeKind, Value};

/// Linking and invocation errors.
///
/// Every failure a call site can produce, both at link time (a fixed name
/// that resolves to nothing) and at call time (bounds violations, overload
/// resolution against runtime arguments, security denials). All variants
/// propagate to the immediate caller of `invoke`; only guard-miss relinking
/// is retried internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// A fixed-name resolution found nothing applicable at link time.
    #[error("no applicable {operation:?} operation for '{name}'")]
    NoApplicableOperation {
        /// Operation that failed to link
        operation: StandardOperation,
        /// Fixed operand name (empty when the operation carries none)
        name: String,
    },

    /// A write found no live settable target at call time.
    ///
    /// Raised when a dynamic member name resolves to nothing, and when a
    /// resolved slot write is rejected by its storage. The read variant is
    /// recovered as a null result and never surfaces; a write cannot
    /// silently vanish, so it fails with this kind.
    #[error("unresolved dynamic member '{name}'")]
    RuntimeUnresolved {
        /// Runtime-supplied member name
        name: String,
    },

    /// Index outside a fixed array's bounds.
    #[error("array index {index} out of bounds (length {len})")]
    ArrayIndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Array length at the time of access
        len: usize,
    },

    /// Index outside a list-like container's bounds.
    #[error("list index {index} out of bounds (size {len})")]
    ListIndexOutOfBounds {
        /// Requested index
        index: i64,
        /// List size at the time of access
        len: usize,
    },

    /// No overload of a method or constructor accepted the argument types.
    #[error("no overload of '{name}' matches {arity} argument(s)")]
    NoMatchingOverload {
        /// Method or constructor name
        name: String,
        /// Argument count supplied
        arity: usize,
    },

    /// Two or more overloads tied as the best match.
    #[error("ambiguous overloads for '{name}'")]
    AmbiguousOverload {
        /// Method or constructor name
        name: String,
    },

    /// Security denial under restricted (public-only) access mode.
    #[error("member '{name}' is not accessible")]
    InaccessibleMember {
        /// Member name
        name: String,
    },

    /// Security denial under full access mode.
    #[error("access to sensitive member '{name}' denied by host policy")]
    SecurityViolation {
        /// Member name
        name: String,
    },

    /// An operand had the wrong runtime shape (non-integer index, NEW on a
    /// non-type receiver, instance call without a receiver).
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// What the operation required
        expected: &'static str,
        /// What was actually supplied
        found: &'static str,
    },
}

/// Result alias for linking and invocation.
pub type LinkResult<T> = Result<T, LinkError>;
