//! Repository traits for share metadata.

pub mod shares;

pub use shares::{GrantAttempt, ShareRepo};
