//! Per-call-site cache cell.
//!
//! A [`DynamicAccessPoint`] owns the one currently active
//! [`LinkedInvocation`] for its call site. Every invocation loads the
//! current snapshot, checks its guard against the actual receiver, and on a
//! miss asks the linker to re-resolve against the new shapes. The snapshot
//! is swapped atomically as a whole, so a concurrent reader always sees a
//! matched (guard, target) pair; concurrent relinks of the same site may
//! race, and the last successful swap wins — the linker is stateless, so
//! any racing result is valid for the shapes it observed.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::linker::{LinkedInvocation, Linker};
use crate::ops::CallDescriptor;
use crate::value::Value;
use crate::LinkResult;

/// A single dynamically resolved call location.
///
/// State machine: unlinked (no cached invocation) → linked (guard + target
/// cached) → relinking on guard failure → linked with the replacement.
/// There is no terminal state; the site just gets dropped by its owner.
pub struct DynamicAccessPoint {
    descriptor: CallDescriptor,
    linker: Arc<Linker>,
    current: ArcSwapOption<LinkedInvocation>,
}

impl DynamicAccessPoint {
    /// Create an unlinked access point for one call site.
    pub fn new(descriptor: CallDescriptor, linker: Arc<Linker>) -> Self {
        Self { descriptor, linker, current: ArcSwapOption::const_empty() }
    }

    /// The descriptor this site was created with.
    pub fn descriptor(&self) -> &CallDescriptor {
        &self.descriptor
    }

    /// Whether a linking is currently cached. Diagnostic only; the answer
    /// may be stale by the time the caller acts on it.
    pub fn is_linked(&self) -> bool {
        self.current.load().is_some()
    }

    /// Perform the site's operation against a receiver and arguments.
    ///
    /// Fast path: the cached guard passes and the cached target runs. Slow
    /// path (first use, or the receiver changed shape): the linker resolves
    /// the descriptor against the actual values, the fresh invocation is
    /// swapped in, and then it runs.
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> LinkResult<Value> {
        if let Some(invocation) = self.current.load_full() {
            if invocation.guard().check(receiver) {
                return invocation.invoke(receiver, args);
            }
        }
        self.relink_and_invoke(receiver, args)
    }

    fn relink_and_invoke(&self, receiver: &Value, args: &[Value]) -> LinkResult<Value> {
        let invocation = Arc::new(self.linker.link(&self.descriptor, receiver, args)?);
        self.current.store(Some(invocation.clone()));
        invocation.invoke(receiver, args)
    }
}

impl std::fmt::Debug for DynamicAccessPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicAccessPoint")
            .field("descriptor", &self.descriptor)
            .field("linked", &self.is_linked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{AccessMode, StandardOperation, TypeTag};

    fn length_site() -> DynamicAccessPoint {
        let descriptor = CallDescriptor::new(
            AccessMode::Public,
            StandardOperation::GetLength,
            vec![TypeTag::Any],
            TypeTag::Int,
        );
        DynamicAccessPoint::new(descriptor, Arc::new(Linker::new()))
    }

    #[test]
    fn starts_unlinked_and_links_on_first_use() {
        let site = length_site();
        assert!(!site.is_linked());

        let arr = Value::array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(site.invoke(&arr, &[]).unwrap(), Value::Int(2));
        assert!(site.is_linked());
    }

    #[test]
    fn relinks_when_receiver_family_changes() {
        let site = length_site();
        let arr = Value::array(vec![Value::Int(1)]);
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

        assert_eq!(site.invoke(&arr, &[]).unwrap(), Value::Int(1));
        let guard_before = site.current.load_full().unwrap().guard();
        assert_eq!(site.invoke(&list, &[]).unwrap(), Value::Int(3));
        let guard_after = site.current.load_full().unwrap().guard();
        assert_ne!(guard_before, guard_after);

        // Swinging back relinks again rather than reusing the list target.
        assert_eq!(site.invoke(&arr, &[]).unwrap(), Value::Int(1));
    }

    #[test]
    fn cached_length_target_reads_live_size() {
        let site = length_site();
        let list = Value::list(vec![]);
        assert_eq!(site.invoke(&list, &[]).unwrap(), Value::Int(0));

        if let Value::List(inner) = &list {
            inner.push(Value::Int(7));
            inner.push(Value::Int(8));
        }
        assert_eq!(site.invoke(&list, &[]).unwrap(), Value::Int(2));

        if let Value::List(inner) = &list {
            inner.clear();
        }
        assert_eq!(site.invoke(&list, &[]).unwrap(), Value::Int(0));
    }
}
