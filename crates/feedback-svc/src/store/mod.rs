//! Persistence boundary for sealed feedback records.
//!
//! Storage only ever sees [`FeedbackRecord`]s: a wrapped DEK, three sealed
//! blobs and two timestamps. It assigns the integer identity on insert.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryFeedbackRepository;
pub use sqlite::SqliteFeedbackRepository;

use async_trait::async_trait;
use envelope::FeedbackRecord;
use thiserror::Error;

/// Errors produced by a repository implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed or is unreachable.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Record storage with storage-assigned identities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Persist `record` and return its new identity.
    async fn insert(&self, record: FeedbackRecord) -> Result<i64, StoreError>;

    /// Load the record with identity `id`, if any.
    async fn get(&self, id: i64) -> Result<Option<FeedbackRecord>, StoreError>;

    /// Number of records currently stored.
    async fn count(&self) -> Result<usize, StoreError>;
}
