use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The key a long URL is mapped to, depending on the allocation strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappingKey {
    /// Sequence id; the short code is its encoding.
    Sequence(u64),
    /// Randomly drawn short code stored verbatim.
    Code(String),
}

/// A row from the `mappings` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRecord {
    pub long_url: String,
    pub key: MappingKey,
    pub created_at: NaiveDateTime,
}

impl MappingRecord {
    pub fn new(long_url: impl Into<String>, key: MappingKey) -> Self {
        Self {
            long_url: long_url.into(),
            key,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Raw row shape used by the SQLite store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MappingRow {
    pub long_url: String,
    pub sequence_id: Option<i64>,
    pub short_code: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Result of a successful `shorten`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrl {
    pub short_url: String,
    pub code: String,
}
