//! [`SqliteFeedbackRepository`]: durable record storage in a single SQLite file.
//!
//! Every call runs on the blocking pool; the connection sits behind a mutex
//! because `rusqlite::Connection` is not `Sync`.

use std::sync::Arc;

use async_trait::async_trait;
use envelope::{FeedbackRecord, WrappedDek};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::{FeedbackRepository, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS secure_feedback (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_email     BLOB,
    contact_number     BLOB,
    encrypted_feedback BLOB,
    dek                BLOB,
    created_at         DATETIME,
    updated_at         DATETIME
);
";

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Repository backed by the `secure_feedback` table.
///
/// Ids come from SQLite `AUTOINCREMENT`: they start at 1 and are never reused,
/// even after deletes made outside the service.
#[derive(Clone)]
pub struct SqliteFeedbackRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFeedbackRepository {
    /// Open (or create) the database at `path` and ensure the table exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the file cannot be opened or the
    /// schema cannot be applied.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!(path, "opened SQLite feedback store");
        Self::with_connection(conn)
    }

    /// Private in-memory database; contents vanish with the last clone.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            op(&guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("storage task failed: {e}")))?
        .map_err(StoreError::from)
    }
}

impl std::fmt::Debug for SqliteFeedbackRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteFeedbackRepository").finish_non_exhaustive()
    }
}

#[async_trait]
impl FeedbackRepository for SqliteFeedbackRepository {
    async fn insert(&self, record: FeedbackRecord) -> Result<i64, StoreError> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO secure_feedback
                    (customer_email, contact_number, encrypted_feedback, dek, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.email,
                    record.contact_number,
                    record.feedback,
                    record.wrapped_dek.as_bytes(),
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Option<FeedbackRecord>, StoreError> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, customer_email, contact_number, encrypted_feedback, dek,
                        created_at, updated_at
                 FROM secure_feedback WHERE id = ?1",
                params![id],
                |row| {
                    Ok(FeedbackRecord {
                        id: Some(row.get(0)?),
                        email: row.get(1)?,
                        contact_number: row.get(2)?,
                        feedback: row.get(3)?,
                        wrapped_dek: WrappedDek::new(row.get(4)?),
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()
        })
        .await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .run(|conn| {
                conn.query_row("SELECT COUNT(*) FROM secure_feedback", [], |row| row.get(0))
            })
            .await?;
        usize::try_from(n).map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_record(tag: u8) -> FeedbackRecord {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        FeedbackRecord {
            id: None,
            wrapped_dek: WrappedDek::new(vec![tag; 256]),
            email: vec![tag; 45],
            contact_number: vec![tag.wrapping_add(1); 44],
            feedback: vec![tag.wrapping_add(2); 45],
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn insert_then_get_returns_identical_record() {
        let repo = SqliteFeedbackRepository::open_in_memory().unwrap();
        let record = sample_record(7);

        let id = repo.insert(record.clone()).await.unwrap();
        assert_eq!(id, 1);

        let stored = repo.get(id).await.unwrap().unwrap();
        assert_eq!(stored, record.with_id(1));
    }

    #[tokio::test]
    async fn missing_id_is_none() {
        let repo = SqliteFeedbackRepository::open_in_memory().unwrap();
        assert!(repo.get(42).await.unwrap().is_none());
        repo.insert(sample_record(1)).await.unwrap();
        assert!(repo.get(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ids_increase_and_count_tracks_inserts() {
        let repo = SqliteFeedbackRepository::open_in_memory().unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert_eq!(repo.insert(sample_record(1)).await.unwrap(), 1);
        assert_eq!(repo.insert(sample_record(2)).await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let path = std::env::temp_dir().join(format!("feedback-{}.db", std::process::id()));
        let path = path.to_string_lossy().into_owned();
        let _ = std::fs::remove_file(&path);

        let id = {
            let repo = SqliteFeedbackRepository::open(&path).unwrap();
            repo.insert(sample_record(9)).await.unwrap()
        };
        let reopened = SqliteFeedbackRepository::open(&path).unwrap();
        let stored = reopened.get(id).await.unwrap().unwrap();
        assert_eq!(stored.wrapped_dek.as_bytes(), &[9u8; 256]);

        drop(reopened);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn clones_share_the_connection() {
        let repo = SqliteFeedbackRepository::open_in_memory().unwrap();
        let other = repo.clone();
        repo.insert(sample_record(3)).await.unwrap();
        assert_eq!(other.count().await.unwrap(), 1);
    }
}
