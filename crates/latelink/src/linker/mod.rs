//! Stateless resolution engine.
//!
//! [`Linker::link`] takes a call descriptor plus the runtime values actually
//! observed at the site and produces a [`LinkedInvocation`]: an invocable
//! target paired with the guard under which the target remains valid. The
//! linker holds no mutable state; concurrent links of the same site may race
//! freely and any successful result is valid for the shapes it was linked
//! against.

mod indexed;
mod method;
mod property;

use std::sync::Arc;

use crate::guard::Guard;
use crate::ops::{AccessMode, CallDescriptor, StandardOperation};
use crate::policy::{DenySensitive, MemberRef, SecurityPolicy, Verdict};
use crate::value::Value;
use crate::{LinkError, LinkResult};

/// An invocable linked target: `(receiver, args) -> result`.
pub type TargetFn = Arc<dyn Fn(&Value, &[Value]) -> LinkResult<Value> + Send + Sync>;

/// The product of one successful link: a target and the guard that must
/// pass before every reuse of it. Immutable; replaced whole on relink.
#[derive(Clone)]
pub struct LinkedInvocation {
    guard: Guard,
    target: TargetFn,
}

impl LinkedInvocation {
    pub(crate) fn new(guard: Guard, target: TargetFn) -> Self {
        Self { guard, target }
    }

    /// The guard protecting this linking.
    pub fn guard(&self) -> Guard {
        self.guard
    }

    /// Run the target. The caller is responsible for having checked the
    /// guard; targets still verify receiver shape before touching payloads.
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> LinkResult<Value> {
        (self.target)(receiver, args)
    }
}

impl std::fmt::Debug for LinkedInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedInvocation").field("guard", &self.guard).finish()
    }
}

/// Resolution engine: pure dispatch from descriptors and observed shapes to
/// linked invocations, with host security policy applied at the end of
/// every member resolution.
pub struct Linker {
    policy: Arc<dyn SecurityPolicy>,
}

impl Linker {
    /// A linker with the baseline policy (deny sensitive members).
    pub fn new() -> Self {
        Self { policy: Arc::new(DenySensitive) }
    }

    /// A linker enforcing a host-supplied policy.
    pub fn with_policy(policy: Arc<dyn SecurityPolicy>) -> Self {
        Self { policy }
    }

    /// Resolve a descriptor against the shapes of the values observed at
    /// the call site.
    pub fn link(
        &self,
        descriptor: &CallDescriptor,
        receiver: &Value,
        args: &[Value],
    ) -> LinkResult<LinkedInvocation> {
        match descriptor.operation().base() {
            StandardOperation::GetProperty => property::link_get(self, descriptor, receiver),
            StandardOperation::SetProperty => property::link_set(self, descriptor, receiver),
            StandardOperation::GetLength => indexed::link_length(receiver),
            StandardOperation::GetElement => indexed::link_get_element(receiver),
            StandardOperation::SetElement => indexed::link_set_element(receiver),
            StandardOperation::GetMethod => method::link_get_method(self, descriptor, receiver),
            StandardOperation::CallMethod => method::link_call_method(self, descriptor, receiver),
            StandardOperation::Call => method::link_call(self, descriptor),
            StandardOperation::New => method::link_new(self, descriptor, receiver, args),
        }
    }

    pub(crate) fn policy(&self) -> &Arc<dyn SecurityPolicy> {
        &self.policy
    }

    /// Map a policy verdict to the access-mode-dependent denial kind.
    pub(crate) fn vet(&self, member: &MemberRef<'_>, mode: AccessMode) -> LinkResult<()> {
        vet_with(&*self.policy, member, mode)
    }
}

impl Default for Linker {
    fn default() -> Self {
        Self::new()
    }
}

/// Policy check usable from call-time closures that only captured the
/// policy handle.
pub(crate) fn vet_with(
    policy: &dyn SecurityPolicy,
    member: &MemberRef<'_>,
    mode: AccessMode,
) -> LinkResult<()> {
    match policy.check(member, mode) {
        Verdict::Allow => Ok(()),
        Verdict::Deny => Err(deny_error(mode, member.member_name)),
    }
}

/// The denial kind a caller sees depends on the site's access mode: the
/// restricted mode gets the lighter "inaccessible member" failure, full
/// access gets the explicit security violation.
pub(crate) fn deny_error(mode: AccessMode, name: &str) -> LinkError {
    match mode {
        AccessMode::Public => LinkError::InaccessibleMember { name: name.to_string() },
        AccessMode::Full => LinkError::SecurityViolation { name: name.to_string() },
    }
}

/// Whether a member with the given visibility resolves at all under the
/// given access mode. Invisible members are absent, not denied.
pub(crate) fn visible(visibility: crate::class::Visibility, mode: AccessMode) -> bool {
    mode == AccessMode::Full || visibility == crate::class::Visibility::Public
}

pub(crate) fn no_applicable(operation: StandardOperation, name: &str) -> LinkError {
    LinkError::NoApplicableOperation { operation, name: name.to_string() }
}
