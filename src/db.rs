use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    allocator::SequenceAllocator,
    error::BackendError,
    models::{MappingKey, MappingRecord, MappingRow},
    store::MappingStore,
};

// ── Pool ───────────────────────────────────────────────────────────────────

/// Open the SQLite pool, creating the file if it doesn't exist yet, and apply
/// the embedded migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(
            database_url
                .parse::<SqliteConnectOptions>()?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
        )
        .await?;

    migrate(&pool).await?;
    tracing::info!("Database migrations applied");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

// ── Mappings ───────────────────────────────────────────────────────────────

const SELECT_MAPPING: &str = "SELECT long_url, sequence_id, short_code, created_at FROM mappings";

/// [`MappingStore`] over the `mappings` table.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TryFrom<MappingRow> for MappingRecord {
    type Error = BackendError;

    fn try_from(row: MappingRow) -> Result<Self, Self::Error> {
        let key = match (row.sequence_id, row.short_code) {
            (Some(id), None) => MappingKey::Sequence(u64::try_from(id).map_err(|_| {
                BackendError::Unavailable(format!("negative sequence id {id} in mappings"))
            })?),
            (None, Some(code)) => MappingKey::Code(code),
            _ => {
                return Err(BackendError::Unavailable(format!(
                    "mapping for {} has no usable key",
                    row.long_url
                )))
            }
        };
        Ok(MappingRecord {
            long_url: row.long_url,
            key,
            created_at: row.created_at,
        })
    }
}

fn to_sql_id(id: u64) -> Result<i64, BackendError> {
    i64::try_from(id)
        .map_err(|_| BackendError::Unavailable(format!("sequence id {id} exceeds SQLite INTEGER")))
}

#[async_trait]
impl MappingStore for SqliteStore {
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<MappingRecord>, BackendError> {
        // Oldest row wins if concurrent shortens ever raced past the existence check.
        let row: Option<MappingRow> =
            sqlx::query_as(&format!("{SELECT_MAPPING} WHERE long_url = ?1 ORDER BY id LIMIT 1"))
                .bind(long_url)
                .fetch_optional(&self.pool)
                .await?;

        row.map(MappingRecord::try_from).transpose()
    }

    async fn find_by_sequence_id(&self, id: u64) -> Result<Option<MappingRecord>, BackendError> {
        // Ids beyond i64 can't be stored, so they can't be found either.
        let Ok(id) = i64::try_from(id) else {
            return Ok(None);
        };
        let row: Option<MappingRow> =
            sqlx::query_as(&format!("{SELECT_MAPPING} WHERE sequence_id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(MappingRecord::try_from).transpose()
    }

    async fn find_by_short_code(&self, code: &str) -> Result<Option<MappingRecord>, BackendError> {
        let row: Option<MappingRow> =
            sqlx::query_as(&format!("{SELECT_MAPPING} WHERE short_code = ?1"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        row.map(MappingRecord::try_from).transpose()
    }

    async fn save(&self, record: &MappingRecord) -> Result<(), BackendError> {
        let (sequence_id, short_code) = match &record.key {
            MappingKey::Sequence(id) => (Some(to_sql_id(*id)?), None),
            MappingKey::Code(code) => (None, Some(code.as_str())),
        };

        sqlx::query(
            "INSERT INTO mappings (long_url, sequence_id, short_code, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&record.long_url)
        .bind(sequence_id)
        .bind(short_code)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ── Sequences ──────────────────────────────────────────────────────────────

/// [`SequenceAllocator`] backed by a named row in the `sequences` table.
///
/// Each call is a single upsert statement, so SQLite's write lock makes the
/// increment atomic across every connection and process sharing the file.
#[derive(Clone, Debug)]
pub struct SqliteSequence {
    pool: SqlitePool,
    name: String,
}

impl SqliteSequence {
    pub fn new(pool: SqlitePool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }
}

#[async_trait]
impl SequenceAllocator for SqliteSequence {
    async fn next(&self) -> Result<u64, BackendError> {
        let value: i64 = sqlx::query_scalar(
            "INSERT INTO sequences (name, value) VALUES (?1, 1)
             ON CONFLICT(name) DO UPDATE SET value = value + 1
             RETURNING value",
        )
        .bind(&self.name)
        .fetch_one(&self.pool)
        .await?;

        u64::try_from(value).map_err(|_| {
            BackendError::Unavailable(format!("sequence {} returned {value}", self.name))
        })
    }
}
