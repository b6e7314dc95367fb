use serde::Serialize;
use serde_json::Value;

use super::domain::{OwnerId, RecordId};

/// Persisted submission as handed back by the document store.
///
/// The document is kept untyped: records written by older form versions carry different
/// shapes and are only interpreted at read time by the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSubmission {
    pub id: RecordId,
    pub document: Value,
}

impl StoredSubmission {
    pub fn owner_id(&self) -> Option<&str> {
        self.document.get("ownerId").and_then(Value::as_str)
    }
}

/// Document store seam. Records are created once and never updated.
pub trait SubmissionStore: Send + Sync {
    /// Persist a new document; the store assigns the id and stamps `createdAt`.
    fn create(&self, owner: &OwnerId, document: Value) -> Result<RecordId, RepositoryError>;
    /// Every record owned by `owner`, in no particular order.
    fn query(&self, owner: &OwnerId) -> Result<Vec<StoredSubmission>, RepositoryError>;
    fn fetch(
        &self,
        owner: &OwnerId,
        id: &RecordId,
    ) -> Result<Option<StoredSubmission>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("document rejected: {0}")]
    Rejected(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
