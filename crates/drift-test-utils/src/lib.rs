//! Shared test utilities for scim-drift.
//!
//! This crate provides fixture data (a throwaway GitHub App key, GraphQL and
//! SCIM page bodies) and a mock GitHub server for use across the workspace.

#![allow(missing_docs)]

pub mod fixtures;
pub mod mock;

pub use fixtures::*;
pub use mock::{MockGitHub, SequenceResponder};
