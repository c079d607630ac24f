//! Guards: shape predicates protecting cached linkings.
//!
//! A guard is evaluated against the receiver before every reuse of a cached
//! target. It answers exactly one question: is the strategy the linker chose
//! for the observed shapes still valid for this receiver?

use crate::class::ClassId;
use crate::value::{ShapeKind, Value};

/// Predicate paired with a linked target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Target handles every receiver (it re-dispatches per call)
    Always,
    /// Receiver must have the given shape
    Shape(ShapeKind),
    /// Receiver must be an instance of exactly the given class
    InstanceOf(ClassId),
    /// Receiver must be the static namespace of exactly the given class
    StaticOf(ClassId),
    /// Receiver must be the type token of exactly the given class
    TypeToken(ClassId),
}

impl Guard {
    /// Evaluate the predicate against a receiver.
    pub fn check(&self, receiver: &Value) -> bool {
        match self {
            Guard::Always => true,
            Guard::Shape(kind) => receiver.shape() == *kind,
            Guard::InstanceOf(id) => match receiver {
                Value::Object(obj) => obj.class().id() == *id,
                _ => false,
            },
            Guard::StaticOf(id) => match receiver {
                Value::StaticNamespace(class) => class.id() == *id,
                _ => false,
            },
            Guard::TypeToken(id) => match receiver {
                Value::Class(class) => class.id() == *id,
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassSpec;
    use crate::value::ObjectValue;
    use std::sync::Arc;

    #[test]
    fn shape_guard_distinguishes_container_families() {
        let arr = Value::array(vec![Value::Int(1)]);
        let list = Value::list(vec![Value::Int(1)]);

        assert!(Guard::Shape(ShapeKind::Array).check(&arr));
        assert!(!Guard::Shape(ShapeKind::Array).check(&list));
        assert!(Guard::Shape(ShapeKind::List).check(&list));
    }

    #[test]
    fn instance_guard_is_exact_class() {
        let a = ClassSpec::builder("A").build();
        let b = ClassSpec::builder("B").build();
        let obj = Value::Object(Arc::new(ObjectValue::new(a.clone())));

        assert!(Guard::InstanceOf(a.id()).check(&obj));
        assert!(!Guard::InstanceOf(b.id()).check(&obj));
        assert!(!Guard::TypeToken(a.id()).check(&obj));
    }

    #[test]
    fn token_guards_separate_class_and_namespace() {
        let class = ClassSpec::builder("C").build();
        let token = Value::Class(class.clone());
        let ns = Value::StaticNamespace(class.clone());

        assert!(Guard::TypeToken(class.id()).check(&token));
        assert!(!Guard::TypeToken(class.id()).check(&ns));
        assert!(Guard::StaticOf(class.id()).check(&ns));
        assert!(!Guard::StaticOf(class.id()).check(&token));
    }
}
