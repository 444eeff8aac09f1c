use async_trait::async_trait;

use crate::error::BackendError;

/// Source of globally unique, strictly increasing sequence ids.
///
/// Implementations must be backed by storage shared by every service
/// instance; gaps are allowed, duplicates are not.
#[async_trait]
pub trait SequenceAllocator: Send + Sync {
    async fn next(&self) -> Result<u64, BackendError>;
}
