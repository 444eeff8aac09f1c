use async_trait::async_trait;

use crate::error::BackendError;
use crate::models::MappingRecord;

/// Authoritative, persistent long URL <-> key mapping.
///
/// `save` performs a single atomic insert and does not check whether the long
/// URL is already mapped; callers look it up first. A clash on the unique key
/// (sequence id or short code) is reported as [`BackendError::Conflict`].
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<MappingRecord>, BackendError>;

    async fn find_by_sequence_id(&self, id: u64) -> Result<Option<MappingRecord>, BackendError>;

    async fn find_by_short_code(&self, code: &str) -> Result<Option<MappingRecord>, BackendError>;

    async fn save(&self, record: &MappingRecord) -> Result<(), BackendError>;
}
