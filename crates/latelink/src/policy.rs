//! Host security policy collaborator.
//!
//! The linker resolves members and then asks the host whether a sensitive
//! member may actually be used. The policy is synchronous and stateless from
//! the linker's point of view; no ambient permission state exists. Denial
//! presentation (which error kind the caller sees) is decided by the linker
//! from the call site's access mode, not here.

use crate::class::MemberKind;
use crate::ops::AccessMode;

/// A resolved member submitted for a policy verdict.
#[derive(Debug, Clone, Copy)]
pub struct MemberRef<'a> {
    /// Name of the owning class
    pub class_name: &'a str,
    /// Member name (class name for constructors)
    pub member_name: &'a str,
    /// Member kind
    pub kind: MemberKind,
    /// Whether the member's spec flags it sensitive
    pub sensitive: bool,
}

/// Policy verdict for one member use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Resolution may proceed
    Allow,
    /// Resolution must fail with an access-mode-dependent denial
    Deny,
}

/// Host-supplied access decision for resolved members.
pub trait SecurityPolicy: Send + Sync {
    /// Decide whether a resolved member may be used from a call site with
    /// the given access mode. Called once per resolution (or per call for
    /// call-time-resolved paths), after visibility filtering.
    fn check(&self, member: &MemberRef<'_>, mode: AccessMode) -> Verdict;
}

/// Permits everything, sensitive or not.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl SecurityPolicy for AllowAll {
    fn check(&self, _member: &MemberRef<'_>, _mode: AccessMode) -> Verdict {
        Verdict::Allow
    }
}

/// Baseline policy: denies any member flagged sensitive, under either access
/// mode. This is the default policy of a freshly built linker.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenySensitive;

impl SecurityPolicy for DenySensitive {
    fn check(&self, member: &MemberRef<'_>, _mode: AccessMode) -> Verdict {
        if member.sensitive {
            Verdict::Deny
        } else {
            Verdict::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(sensitive: bool) -> MemberRef<'static> {
        MemberRef {
            class_name: "System",
            member_name: "getenv",
            kind: MemberKind::StaticMethod,
            sensitive,
        }
    }

    #[test]
    fn allow_all_ignores_sensitivity() {
        assert_eq!(AllowAll.check(&member(true), AccessMode::Public), Verdict::Allow);
        assert_eq!(AllowAll.check(&member(true), AccessMode::Full), Verdict::Allow);
    }

    #[test]
    fn deny_sensitive_denies_only_flagged_members() {
        assert_eq!(DenySensitive.check(&member(false), AccessMode::Full), Verdict::Allow);
        assert_eq!(DenySensitive.check(&member(true), AccessMode::Public), Verdict::Deny);
        assert_eq!(DenySensitive.check(&member(true), AccessMode::Full), Verdict::Deny);
    }
}
