//! Identity records from both data sources and the canonical join key.
//!
//! Organization members come from the GraphQL API and SCIM identities from the
//! REST API. The two shapes are kept distinct; the only thing they share is
//! the [`CanonicalKey`] each can be projected onto.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Normalized email address used to join members with SCIM identities.
///
/// A key is the trimmed, lowercased form of an email address. Inputs that are
/// empty after trimming have no key; callers see that as `None`, which is the
/// "unmatchable" case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// Builds a canonical key from a raw email address.
    ///
    /// Returns `None` when the address is blank.
    ///
    /// # Example
    ///
    /// ```
    /// use drift_core::CanonicalKey;
    ///
    /// let key = CanonicalKey::from_email("  Alice@Example.COM ").unwrap();
    /// assert_eq!(key.as_str(), "alice@example.com");
    /// assert!(CanonicalKey::from_email("   ").is_none());
    /// ```
    pub fn from_email(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_lowercase()))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A member of the GitHub organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMember {
    /// Unique GitHub handle.
    pub login: String,

    /// GraphQL node ID.
    pub node_id: String,

    /// Emails on the organization's verified domains.
    pub verified_emails: BTreeSet<String>,
}

impl OrgMember {
    /// Creates a member from its login, node ID and verified emails.
    pub fn new<I, S>(login: impl Into<String>, node_id: impl Into<String>, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            login: login.into(),
            node_id: node_id.into(),
            verified_emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    /// Canonical keys contributed by this member, one per usable verified email.
    pub fn canonical_keys(&self) -> BTreeSet<CanonicalKey> {
        self.verified_emails
            .iter()
            .filter_map(|email| CanonicalKey::from_email(email))
            .collect()
    }
}

/// A SCIM-provisioned identity of the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimIdentity {
    /// SCIM resource ID assigned by GitHub.
    pub id: String,

    /// Identifier assigned by the identity provider.
    pub external_id: Option<String>,

    /// SCIM `userName`, usually the IdP login.
    pub user_name: Option<String>,

    /// Primary email address, if the identity has one.
    pub primary_email: Option<String>,

    /// Whether the identity is active in the identity provider.
    pub active: bool,
}

impl ScimIdentity {
    /// Canonical key of this identity, if it carries a primary email.
    pub fn canonical_key(&self) -> Option<CanonicalKey> {
        self.primary_email
            .as_deref()
            .and_then(CanonicalKey::from_email)
    }
}
