use tracing::warn;

use crate::storage::StorageError;

/// Result of a write whose failure must not fail the surrounding operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<T> {
    Persisted(T),
    Skipped { reason: String },
}

impl<T> WriteOutcome<T> {
    pub fn skipped(reason: impl Into<String>) -> Self {
        WriteOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, WriteOutcome::Persisted(_))
    }

    pub fn persisted(self) -> Option<T> {
        match self {
            WriteOutcome::Persisted(value) => Some(value),
            WriteOutcome::Skipped { .. } => None,
        }
    }
}

/// Runs a non-critical write, logging instead of raising when it does not land.
pub(crate) fn non_critical<T, F>(operation: &str, user_id: &str, write: F) -> WriteOutcome<T>
where
    F: FnOnce() -> Result<Option<T>, StorageError>,
{
    match write() {
        Ok(Some(value)) => WriteOutcome::Persisted(value),
        Ok(None) => {
            warn!(operation, user_id, "non-critical write matched no record");
            WriteOutcome::skipped("no matching record")
        }
        Err(err) => {
            warn!(operation, user_id, error = %err, "non-critical write failed");
            WriteOutcome::skipped(err.to_string())
        }
    }
}
