//! Share record repository for Ember share links.
//!
//! This crate is the engine's single source of truth:
//! - Share records, their access policy, and viewer logs
//! - The transactional check-and-increment behind one-time links
//! - Idempotent record deletion (the authoritative "destroyed" signal)

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use repos::{GrantAttempt, ShareRepo};
pub use store::{MetadataStore, SqliteStore};

use ember_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
