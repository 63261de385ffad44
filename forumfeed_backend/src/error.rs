use rusqlite::ErrorCode;
use thiserror::Error;

pub type ForumResult<T> = Result<T, ForumError>;

/// Failures surfaced by the forum services.
///
/// Every variant is raised before or instead of a write, or after the
/// enclosing transaction was rolled back, so none of them leaves the vote
/// ledger and the post aggregates out of step.
#[derive(Debug, Error)]
pub enum ForumError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("not permitted to modify {entity} {id}")]
    NotPermitted { entity: &'static str, id: i64 },
    /// Writer contention that outlived the retry budget.
    #[error("storage conflict persisted after {attempts} attempts")]
    StorageConflict { attempts: u32 },
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(rusqlite::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ForumError {
    pub fn post_not_found(id: i64) -> Self {
        ForumError::NotFound { entity: "post", id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ForumError::Validation(message.into())
    }

    /// Busy/locked database errors are transient and worth retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ForumError::StorageConflict { .. })
    }
}

impl From<rusqlite::Error> for ForumError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                ForumError::StorageConflict { attempts: 1 }
            }
            _ => ForumError::Storage(err),
        }
    }
}

/// Repositories speak `anyhow`; recover the rusqlite cause when there is one
/// so contention is still recognised as a conflict.
pub(crate) fn from_repository(err: anyhow::Error) -> ForumError {
    match err.downcast::<rusqlite::Error>() {
        Ok(sqlite) => ForumError::from(sqlite),
        Err(other) => ForumError::Internal(other),
    }
}
