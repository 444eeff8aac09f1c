use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    allocator::SequenceAllocator,
    cache::ResolutionCache,
    config::ShortenerConfig,
    encoder::{AlphabetError, CodeEncoder},
    error::{BackendError, ShortenError},
    models::{MappingKey, MappingRecord, ShortUrl},
    store::MappingStore,
    validate::validate_long_url,
};

/// How a long URL seen for the first time gets its key.
#[derive(Clone)]
pub enum AllocationStrategy {
    /// Next id from a shared counter, encoded with the code alphabet.
    Sequence(Arc<dyn SequenceAllocator>),
    /// Random codes, each checked against the store before use.
    Random { code_length: usize, max_attempts: u32 },
}

impl std::fmt::Debug for AllocationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationStrategy::Sequence(_) => f.write_str("Sequence"),
            AllocationStrategy::Random {
                code_length,
                max_attempts,
            } => f
                .debug_struct("Random")
                .field("code_length", code_length)
                .field("max_attempts", max_attempts)
                .finish(),
        }
    }
}

fn url_key(long_url: &str) -> String {
    format!("url:{long_url}")
}

fn code_key(code: &str) -> String {
    format!("code:{code}")
}

/// Coordinates cache, store, allocator and encoder for `shorten` and `resolve`.
///
/// The store is authoritative; the cache is written after the store and only
/// ever read as an accelerator. Cache failures are logged and ignored, store
/// and allocator failures end the request.
pub struct Shortener {
    store: Arc<dyn MappingStore>,
    cache: Arc<dyn ResolutionCache>,
    strategy: AllocationStrategy,
    encoder: CodeEncoder,
    prefix: String,
    cache_ttl: Duration,
}

impl Shortener {
    pub fn new(
        config: &ShortenerConfig,
        store: Arc<dyn MappingStore>,
        cache: Arc<dyn ResolutionCache>,
        strategy: AllocationStrategy,
    ) -> Result<Self, AlphabetError> {
        Ok(Self {
            store,
            cache,
            strategy,
            encoder: CodeEncoder::new(&config.alphabet)?,
            prefix: config.short_url_prefix.clone(),
            cache_ttl: config.cache_ttl,
        })
    }

    /// Map `long_url` to its short URL, allocating a new key only if the URL
    /// has never been seen before.
    pub async fn shorten(&self, long_url: &str) -> Result<ShortUrl, ShortenError> {
        let long_url = validate_long_url(long_url)?;

        if let Some(code) = self.cached_code(long_url).await {
            debug!("Cache hit for {}", long_url);
            return Ok(self.short_url(code));
        }

        if let Some(record) = self
            .store
            .find_by_long_url(long_url)
            .await
            .map_err(ShortenError::StoreUnavailable)?
        {
            debug!("Store hit for {}", long_url);
            let code = self.code_for(&record.key);
            self.remember(&record, &code).await;
            return Ok(self.short_url(code));
        }

        let inserted = self.insert_new(long_url).await?;
        // A concurrent first-time shorten of the same URL may have saved its
        // own row; every caller settles on the oldest one.
        let record = self
            .store
            .find_by_long_url(long_url)
            .await
            .map_err(ShortenError::StoreUnavailable)?
            .unwrap_or(inserted);
        let code = self.code_for(&record.key);
        info!("Shortened {} -> {}", long_url, code);
        self.remember(&record, &code).await;
        Ok(self.short_url(code))
    }

    /// Look up the long URL behind `code`. `Ok(None)` means no such mapping.
    pub async fn resolve(&self, code: &str) -> Result<Option<String>, ShortenError> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }

        let key = code_key(code);
        if let Some(long_url) = self.cache_get(&key).await {
            debug!("Cache hit for code {}", code);
            return Ok(Some(long_url));
        }

        if !self.encoder.is_alphabet_code(code) {
            // Never issued by the encoder, so there is nothing to find.
            debug!("Unresolvable code {:?}", code);
            return Ok(None);
        }

        let found = self
            .find_by_code(code)
            .await
            .map_err(ShortenError::StoreUnavailable)?;

        match found {
            Some(record) => {
                self.cache_set(&key, &record.long_url).await;
                Ok(Some(record.long_url))
            }
            None => Ok(None),
        }
    }

    /// Look a code up under both key types, the active strategy's first.
    /// Rows written under the other strategy stay resolvable.
    async fn find_by_code(&self, code: &str) -> Result<Option<MappingRecord>, BackendError> {
        let id = self.encoder.decode(code).ok();
        match &self.strategy {
            AllocationStrategy::Sequence(_) => {
                if let Some(id) = id {
                    if let Some(record) = self.store.find_by_sequence_id(id).await? {
                        return Ok(Some(record));
                    }
                }
                self.store.find_by_short_code(code).await
            }
            AllocationStrategy::Random { .. } => {
                if let Some(record) = self.store.find_by_short_code(code).await? {
                    return Ok(Some(record));
                }
                match id {
                    Some(id) => self.store.find_by_sequence_id(id).await,
                    None => Ok(None),
                }
            }
        }
    }

    // ── Allocation ─────────────────────────────────────────────────────────

    async fn insert_new(&self, long_url: &str) -> Result<MappingRecord, ShortenError> {
        match &self.strategy {
            AllocationStrategy::Sequence(allocator) => {
                let id = allocator
                    .next()
                    .await
                    .map_err(ShortenError::AllocatorUnavailable)?;
                let record = MappingRecord::new(long_url, MappingKey::Sequence(id));
                self.store
                    .save(&record)
                    .await
                    .map_err(ShortenError::StoreUnavailable)?;
                Ok(record)
            }
            AllocationStrategy::Random {
                code_length,
                max_attempts,
            } => {
                self.insert_random(long_url, *code_length, *max_attempts)
                    .await
            }
        }
    }

    /// Each attempt is an independent store round trip; nothing is held
    /// between attempts.
    async fn insert_random(
        &self,
        long_url: &str,
        code_length: usize,
        max_attempts: u32,
    ) -> Result<MappingRecord, ShortenError> {
        for attempt in 1..=max_attempts {
            let code = self.encoder.random_code(code_length);

            // Also taken when it is the encoding of an existing sequence row.
            let taken = self
                .find_by_code(&code)
                .await
                .map_err(ShortenError::StoreUnavailable)?;
            if taken.is_some() {
                debug!("Code {} already taken (attempt {}/{})", code, attempt, max_attempts);
                continue;
            }

            let record = MappingRecord::new(long_url, MappingKey::Code(code));
            match self.store.save(&record).await {
                Ok(()) => return Ok(record),
                Err(BackendError::Conflict(msg)) => {
                    debug!("Lost race for a code (attempt {}/{}): {}", attempt, max_attempts, msg);
                }
                Err(e) => return Err(ShortenError::StoreUnavailable(e)),
            }
        }

        warn!(
            "Gave up finding a free {}-character code after {} attempts",
            code_length, max_attempts
        );
        Err(ShortenError::CollisionRetryExhausted {
            attempts: max_attempts,
        })
    }

    // ── Codes and cache values ─────────────────────────────────────────────

    fn code_for(&self, key: &MappingKey) -> String {
        match key {
            MappingKey::Sequence(id) => self.encoder.encode(*id),
            MappingKey::Code(code) => code.clone(),
        }
    }

    fn short_url(&self, code: String) -> ShortUrl {
        ShortUrl {
            short_url: format!("{}{}", self.prefix, code),
            code,
        }
    }

    /// The `url:` entry holds the code itself, whichever key type the record has.
    async fn cached_code(&self, long_url: &str) -> Option<String> {
        let value = self.cache_get(&url_key(long_url)).await?;
        if self.encoder.is_alphabet_code(&value) {
            return Some(value);
        }
        warn!(
            "Ignoring cached value {:?} for {}; falling back to the store",
            value, long_url
        );
        None
    }

    /// Populate both directions after the store has the record.
    async fn remember(&self, record: &MappingRecord, code: &str) {
        self.cache_set(&url_key(&record.long_url), code).await;
        self.cache_set(&code_key(code), &record.long_url).await;
    }

    /// Read through the cache, refreshing the TTL on a hit.
    async fn cache_get(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(Some(value)) => {
                if let Err(e) = self.cache.expire(key, self.cache_ttl).await {
                    warn!("Cache TTL refresh failed for {}: {}", key, e);
                }
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Cache read failed for {}, using store: {}", key, e);
                None
            }
        }
    }

    async fn cache_set(&self, key: &str, value: &str) {
        if let Err(e) = self.cache.set(key, value, self.cache_ttl).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }
}
