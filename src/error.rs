use thiserror::Error;

/// Failure reported by a collaborator backend (mapping store, counter, cache).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// A unique key (sequence id or short code) is already taken.
    #[error("key already exists: {0}")]
    Conflict(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                BackendError::Conflict(db.message().to_owned())
            }
            _ => BackendError::Database(err),
        }
    }
}

/// Errors returned by [`crate::service::Shortener`].
///
/// A short code with no mapping is not an error: `resolve` returns `Ok(None)`.
#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("invalid long URL: {0}")]
    InvalidLongUrl(String),

    #[error("invalid short code: {0}")]
    InvalidCodeFormat(String),

    #[error("sequence allocator unavailable: {0}")]
    AllocatorUnavailable(#[source] BackendError),

    #[error("mapping store unavailable: {0}")]
    StoreUnavailable(#[source] BackendError),

    #[error("no unused short code found after {attempts} attempts")]
    CollisionRetryExhausted { attempts: u32 },
}

impl ShortenError {
    /// Infrastructure failures may succeed if the caller tries again later.
    /// Validation failures never will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShortenError::AllocatorUnavailable(_)
                | ShortenError::StoreUnavailable(_)
                | ShortenError::CollisionRetryExhausted { .. }
        )
    }
}
