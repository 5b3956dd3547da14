use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt record for user {user_id}: {reason}")]
    CorruptRecord { user_id: String, reason: String },
    #[error("{field} value {value} does not fit the store")]
    ValueOutOfRange { field: &'static str, value: u64 },
}
