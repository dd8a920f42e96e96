//! Core domain types and drift detection for scim-drift.
//!
//! This crate turns the raw records fetched from GitHub into a drift report.
//! It performs no I/O: everything here is a pure function of its inputs, so
//! the whole reconciliation can be exercised from fixtures.
//!
//! # Modules
//!
//! - `identity`: Organization members, SCIM identities and the canonical join key
//! - `normalize`: Projection of both sources onto canonical keys
//! - `compare`: The drift comparator
//! - `report`: The immutable drift report handed to renderers

#![deny(missing_docs)]
#![deny(clippy::all)]

pub mod compare;
pub mod identity;
pub mod normalize;
pub mod report;

pub use compare::{compare, reconcile};
pub use identity::{CanonicalKey, OrgMember, ScimIdentity};
pub use normalize::{normalize_members, normalize_scim, AmbiguousKey, MemberKeys, ScimKeys};
pub use report::{DriftReport, DriftSummary};
