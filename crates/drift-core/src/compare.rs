//! Drift comparator.
//!
//! Computes the three report categories from normalized inputs with key-based
//! set lookups. No network I/O happens here; the output depends only on the
//! arguments, so identical inputs always produce identical reports.

use crate::identity::{OrgMember, ScimIdentity};
use crate::normalize::{normalize_members, normalize_scim, MemberKeys, ScimKeys};
use crate::report::DriftReport;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Compares members against the SCIM key set.
///
/// - A member without any canonical key lands in
///   `members_without_verified_email` and in `members_without_scim`.
/// - A member with keys lands in `members_without_scim` unless one of the
///   keys it owns is present in `scim_keys`. Keys lost to an earlier member
///   during normalization are not matchable.
/// - Everyone else is matched.
///
/// Output lists keep the order of `members`. A login that repeats is only
/// considered at its first occurrence.
pub fn compare(members: &[OrgMember], member_keys: &MemberKeys, scim_keys: &ScimKeys) -> DriftReport {
    let mut seen = HashSet::with_capacity(members.len());
    let mut without_scim = Vec::new();
    let mut without_email = Vec::new();
    let mut matched = Vec::new();

    for member in members {
        if !seen.insert(member.login.as_str()) {
            warn!("member {} returned more than once; ignoring repeat", member.login);
            continue;
        }

        if !member_keys.has_key(&member.login) {
            without_email.push(member.clone());
            without_scim.push(member.clone());
            continue;
        }

        if member_keys
            .owned_keys(member)
            .any(|key| scim_keys.contains(&key))
        {
            matched.push(member.clone());
        } else {
            without_scim.push(member.clone());
        }
    }

    debug!(
        "compared {} members: {} without SCIM, {} without verified email, {} matched",
        seen.len(),
        without_scim.len(),
        without_email.len(),
        matched.len()
    );

    DriftReport::new(
        without_scim,
        without_email,
        matched,
        seen.len(),
        scim_keys.total(),
        scim_keys.active(),
        member_keys.ambiguous().to_vec(),
    )
}

/// Normalizes both sources and compares them.
pub fn reconcile(members: &[OrgMember], identities: &[ScimIdentity]) -> DriftReport {
    let member_keys = normalize_members(members);
    let scim_keys = normalize_scim(identities);
    compare(members, &member_keys, &scim_keys)
}
