//! [`InMemoryFeedbackRepository`]: process-local record storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use envelope::FeedbackRecord;
use tokio::sync::RwLock;

use super::{FeedbackRepository, StoreError};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    records: HashMap<i64, FeedbackRecord>,
}

/// Thread-safe in-memory repository.
///
/// Ids start at 1 and increase monotonically; they are never reused. Clones
/// share the same underlying map.
#[derive(Clone, Debug, Default)]
pub struct InMemoryFeedbackRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryFeedbackRepository {
    /// Create a new, empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn insert(&self, record: FeedbackRecord) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.insert(id, record.with_id(id));
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<FeedbackRecord>, StoreError> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().await.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envelope::WrappedDek;

    fn sample_record(tag: u8) -> FeedbackRecord {
        let now = std::time::SystemTime::UNIX_EPOCH.into();
        FeedbackRecord {
            id: None,
            wrapped_dek: WrappedDek::new(vec![tag; 8]),
            email: vec![tag; 40],
            contact_number: vec![tag; 44],
            feedback: vec![tag; 45],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn initially_empty() {
        let repo = InMemoryFeedbackRepository::new();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let repo = InMemoryFeedbackRepository::new();
        assert_eq!(repo.insert(sample_record(1)).await.unwrap(), 1);
        assert_eq!(repo.insert(sample_record(2)).await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn get_returns_record_with_identity() {
        let repo = InMemoryFeedbackRepository::new();
        let id = repo.insert(sample_record(7)).await.unwrap();
        let stored = repo.get(id).await.unwrap().unwrap();
        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.wrapped_dek.as_bytes(), &[7u8; 8]);
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let repo = InMemoryFeedbackRepository::new();
        let other = repo.clone();
        repo.insert(sample_record(1)).await.unwrap();
        assert_eq!(other.count().await.unwrap(), 1);
    }
}
