//! Projection of members and SCIM identities onto canonical keys.

use crate::identity::{CanonicalKey, OrgMember, ScimIdentity};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

/// A canonical key claimed by more than one organization member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousKey {
    /// The shared key.
    pub key: CanonicalKey,
    /// Login of the first member seen with this key. It keeps the key.
    pub kept: String,
    /// Login of a later member that also claimed the key.
    pub duplicate: String,
}

/// Member side of the join: which member owns each canonical key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberKeys {
    owners: BTreeMap<CanonicalKey, String>,
    keyed_logins: BTreeSet<String>,
    ambiguous: Vec<AmbiguousKey>,
}

impl MemberKeys {
    /// Login of the member that owns `key`.
    pub fn owner(&self, key: &CanonicalKey) -> Option<&str> {
        self.owners.get(key).map(String::as_str)
    }

    /// Whether the member contributed at least one canonical key.
    ///
    /// Members that only share a key with an earlier member still count.
    pub fn has_key(&self, login: &str) -> bool {
        self.keyed_logins.contains(login)
    }

    /// Keys of `member` that it owns, i.e. that can be matched against SCIM.
    pub fn owned_keys<'a>(
        &'a self,
        member: &'a OrgMember,
    ) -> impl Iterator<Item = CanonicalKey> + 'a {
        member
            .canonical_keys()
            .into_iter()
            .filter(move |key| self.owner(key) == Some(member.login.as_str()))
    }

    /// Duplicate key claims recorded during normalization.
    pub fn ambiguous(&self) -> &[AmbiguousKey] {
        &self.ambiguous
    }

    /// Number of distinct canonical keys.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether no member contributed a key.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// SCIM side of the join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScimKeys {
    keys: BTreeSet<CanonicalKey>,
    total: usize,
    active: usize,
}

impl ScimKeys {
    /// Whether an active SCIM identity carries `key`.
    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.keys.contains(key)
    }

    /// Number of identities seen, active or not.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of active identities seen.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Distinct keys of active identities.
    pub fn keys(&self) -> &BTreeSet<CanonicalKey> {
        &self.keys
    }
}

/// Maps every verified email of every member to the member that owns it.
///
/// The first member seen with a key keeps it. Later members claiming the same
/// key are recorded as ambiguous and logged; they still count as having a
/// canonical key.
///
/// A login that repeats only contributes the keys of its first occurrence,
/// the same occurrence [`compare`](crate::compare::compare) reports on.
pub fn normalize_members(members: &[OrgMember]) -> MemberKeys {
    let mut normalized = MemberKeys::default();
    let mut seen = HashSet::with_capacity(members.len());

    for member in members {
        if !seen.insert(member.login.as_str()) {
            debug!("skipping repeated member {}", member.login);
            continue;
        }

        for key in member.canonical_keys() {
            normalized.keyed_logins.insert(member.login.clone());

            match normalized.owners.get(&key) {
                Some(owner) if owner == &member.login => {}
                Some(owner) => {
                    warn!(
                        "verified email {} is shared by {} and {}; keeping {}",
                        key, owner, member.login, owner
                    );
                    normalized.ambiguous.push(AmbiguousKey {
                        key: key.clone(),
                        kept: owner.clone(),
                        duplicate: member.login.clone(),
                    });
                }
                None => {
                    normalized.owners.insert(key, member.login.clone());
                }
            }
        }
    }

    debug!(
        "normalized {} members into {} canonical keys",
        members.len(),
        normalized.owners.len()
    );
    normalized
}

/// Collects the canonical keys of active SCIM identities.
///
/// Inactive identities and identities without an email are counted but do
/// not contribute a key.
pub fn normalize_scim(identities: &[ScimIdentity]) -> ScimKeys {
    let mut normalized = ScimKeys {
        total: identities.len(),
        ..ScimKeys::default()
    };

    for identity in identities.iter().filter(|identity| identity.active) {
        normalized.active += 1;
        match identity.canonical_key() {
            Some(key) => {
                normalized.keys.insert(key);
            }
            None => debug!("SCIM identity {} has no primary email", identity.id),
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(login: &str, emails: &[&str]) -> OrgMember {
        OrgMember::new(login, format!("node-{}", login), emails.iter().copied())
    }

    fn identity(email: Option<&str>, active: bool) -> ScimIdentity {
        ScimIdentity {
            id: format!("id-{}", email.unwrap_or("none")),
            external_id: None,
            user_name: None,
            primary_email: email.map(str::to_string),
            active,
        }
    }

    #[test]
    fn test_member_keys_map_to_owner() {
        let members = vec![member("alice", &["a@x.com", "alice@y.com"]), member("bob", &[])];
        let keys = normalize_members(&members);

        assert_eq!(keys.len(), 2);
        let a = CanonicalKey::from_email("A@X.COM").unwrap();
        assert_eq!(keys.owner(&a), Some("alice"));
        assert!(keys.has_key("alice"));
        assert!(!keys.has_key("bob"));
        assert!(keys.ambiguous().is_empty());
    }

    #[test]
    fn test_duplicate_key_keeps_first_member() {
        let members = vec![member("first", &["shared@x.com"]), member("second", &["Shared@X.com"])];
        let keys = normalize_members(&members);

        let shared = CanonicalKey::from_email("shared@x.com").unwrap();
        assert_eq!(keys.owner(&shared), Some("first"));
        assert!(keys.has_key("second"));
        assert_eq!(
            keys.ambiguous(),
            &[AmbiguousKey {
                key: shared,
                kept: "first".to_string(),
                duplicate: "second".to_string(),
            }]
        );
        assert_eq!(keys.owned_keys(&members[1]).count(), 0);
        assert_eq!(keys.owned_keys(&members[0]).count(), 1);
    }

    #[test]
    fn test_repeated_login_keeps_first_entry_keys() {
        let members = vec![
            member("alice", &["a@x.com"]),
            member("alice", &["alice@other.com"]),
        ];
        let keys = normalize_members(&members);

        assert_eq!(keys.len(), 1);
        assert!(keys.owner(&CanonicalKey::from_email("alice@other.com").unwrap()).is_none());
        assert!(keys.ambiguous().is_empty());

        // only the first entry's email can match SCIM
        let report = crate::reconcile(&members, &[identity(Some("alice@other.com"), true)]);
        assert_eq!(report.total_members(), 1);
        assert_eq!(report.members_without_scim().len(), 1);
        assert!(report.matched_members().is_empty());
    }

    #[test]
    fn test_blank_emails_contribute_no_key() {
        let keys = normalize_members(&[member("ghost", &["  "])]);
        assert!(keys.is_empty());
        assert!(!keys.has_key("ghost"));
    }

    #[test]
    fn test_scim_keys_skip_inactive_and_missing_email() {
        let identities = vec![
            identity(Some("A@x.com"), true),
            identity(Some("b@x.com"), false),
            identity(None, true),
        ];
        let keys = normalize_scim(&identities);

        assert_eq!(keys.total(), 3);
        assert_eq!(keys.active(), 2);
        assert_eq!(keys.keys().len(), 1);
        assert!(keys.contains(&CanonicalKey::from_email("a@x.com").unwrap()));
        assert!(!keys.contains(&CanonicalKey::from_email("b@x.com").unwrap()));
    }
}
