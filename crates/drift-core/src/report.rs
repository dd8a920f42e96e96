//! The drift report handed to renderers.

use crate::identity::OrgMember;
use crate::normalize::AmbiguousKey;
use serde::Serialize;

/// Result of comparing organization members against SCIM identities.
///
/// A report is built once per run by [`crate::compare`] and is read-only
/// afterwards. Both drift lists keep member retrieval order and are
/// independent: a member without a verified email is also a member without
/// SCIM provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    organization: Option<String>,
    members_without_scim: Vec<OrgMember>,
    members_without_verified_email: Vec<OrgMember>,
    matched_members: Vec<OrgMember>,
    total_members: usize,
    total_scim_identities: usize,
    active_scim_identities: usize,
    ambiguous_keys: Vec<AmbiguousKey>,
}

/// Counts-only view of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriftSummary {
    /// Members returned by the organization.
    pub total_members: usize,
    /// SCIM identities returned, active or not.
    pub total_scim_identities: usize,
    /// Active SCIM identities.
    pub active_scim_identities: usize,
    /// Members with no matching SCIM identity.
    pub without_scim: usize,
    /// Members with no verified organization email.
    pub without_verified_email: usize,
    /// Members matched to a SCIM identity.
    pub matched: usize,
    /// Verified emails claimed by more than one member.
    pub ambiguous_keys: usize,
}

impl DriftReport {
    pub(crate) fn new(
        members_without_scim: Vec<OrgMember>,
        members_without_verified_email: Vec<OrgMember>,
        matched_members: Vec<OrgMember>,
        total_members: usize,
        total_scim_identities: usize,
        active_scim_identities: usize,
        ambiguous_keys: Vec<AmbiguousKey>,
    ) -> Self {
        Self {
            organization: None,
            members_without_scim,
            members_without_verified_email,
            matched_members,
            total_members,
            total_scim_identities,
            active_scim_identities,
            ambiguous_keys,
        }
    }

    /// Labels the report with the organization it was computed for.
    pub fn for_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Organization the report belongs to, if labelled.
    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    /// Members with no active SCIM identity sharing one of their verified emails.
    pub fn members_without_scim(&self) -> &[OrgMember] {
        &self.members_without_scim
    }

    /// Members with no verified organization email.
    pub fn members_without_verified_email(&self) -> &[OrgMember] {
        &self.members_without_verified_email
    }

    /// Members matched to an active SCIM identity.
    pub fn matched_members(&self) -> &[OrgMember] {
        &self.matched_members
    }

    /// Total organization members considered.
    pub fn total_members(&self) -> usize {
        self.total_members
    }

    /// Total SCIM identities retrieved.
    pub fn total_scim_identities(&self) -> usize {
        self.total_scim_identities
    }

    /// SCIM identities that are active.
    pub fn active_scim_identities(&self) -> usize {
        self.active_scim_identities
    }

    /// Verified emails claimed by more than one member.
    pub fn ambiguous_keys(&self) -> &[AmbiguousKey] {
        &self.ambiguous_keys
    }

    /// Whether either drift list is non-empty.
    pub fn has_drift(&self) -> bool {
        !self.members_without_scim.is_empty() || !self.members_without_verified_email.is_empty()
    }

    /// Number of distinct members that appear in at least one drift list.
    pub fn drift_count(&self) -> usize {
        // every member without a verified email is also without SCIM
        self.members_without_scim.len()
    }

    /// Returns the counts of this report.
    pub fn summary(&self) -> DriftSummary {
        DriftSummary {
            total_members: self.total_members,
            total_scim_identities: self.total_scim_identities,
            active_scim_identities: self.active_scim_identities,
            without_scim: self.members_without_scim.len(),
            without_verified_email: self.members_without_verified_email.len(),
            matched: self.matched_members.len(),
            ambiguous_keys: self.ambiguous_keys.len(),
        }
    }
}
