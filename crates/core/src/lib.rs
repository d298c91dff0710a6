//! Core domain types and shared logic for Ember share links.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Share records and their access policy
//! - Requester identities and the anonymous marker
//! - The access decision function
//! - Expiry rule resolution
//! - Configuration types for the metadata and blob stores

pub mod access;
pub mod config;
pub mod error;
pub mod expiry;
pub mod share;

pub use access::{Decision, evaluate};
pub use error::{Error, Result};
pub use expiry::{ExpiryPreset, ExpiryRule, ResolvedExpiry, resolve_expiry};
pub use share::{ANONYMOUS_VIEWER, FileKind, Identity, ShareId, ShareRecord, ViewerEntry};
