//! In-process collaborators for tests and single-process demos.
//!
//! Nothing here survives a restart or is shared between processes, so the
//! binary never wires these up.

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    RwLock,
};

use crate::{
    allocator::SequenceAllocator,
    error::BackendError,
    models::{MappingKey, MappingRecord},
    store::MappingStore,
};

/// Atomic counter starting at 1.
#[derive(Debug, Default)]
pub struct AtomicSequence {
    value: AtomicU64,
}

impl AtomicSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after `last`, as if `last` had already been handed out.
    pub fn starting_after(last: u64) -> Self {
        Self {
            value: AtomicU64::new(last),
        }
    }
}

#[async_trait]
impl SequenceAllocator for AtomicSequence {
    async fn next(&self) -> Result<u64, BackendError> {
        let prev = self
            .value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_add(1))
            .map_err(|_| BackendError::Unavailable("sequence exhausted".into()))?;
        Ok(prev + 1)
    }
}

/// Vec-backed mapping store with the same uniqueness rules as the SQL schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<MappingRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<MappingRecord>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn find(&self, pred: impl Fn(&MappingRecord) -> bool) -> Option<MappingRecord> {
        self.read().iter().find(|r| pred(r)).cloned()
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<MappingRecord>, BackendError> {
        Ok(self.find(|r| r.long_url == long_url))
    }

    async fn find_by_sequence_id(&self, id: u64) -> Result<Option<MappingRecord>, BackendError> {
        Ok(self.find(|r| r.key == MappingKey::Sequence(id)))
    }

    async fn find_by_short_code(&self, code: &str) -> Result<Option<MappingRecord>, BackendError> {
        Ok(self.find(|r| matches!(&r.key, MappingKey::Code(c) if c == code)))
    }

    async fn save(&self, record: &MappingRecord) -> Result<(), BackendError> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if records.iter().any(|r| r.key == record.key) {
            return Err(BackendError::Conflict(format!("{:?}", record.key)));
        }
        records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashSet, sync::Arc};

    #[tokio::test]
    async fn atomic_sequence_starts_at_one() {
        let seq = AtomicSequence::new();
        assert_eq!(seq.next().await.unwrap(), 1);
        assert_eq!(seq.next().await.unwrap(), 2);

        let resumed = AtomicSequence::starting_after(41);
        assert_eq!(resumed.next().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn atomic_sequence_refuses_to_wrap() {
        let seq = AtomicSequence::starting_after(u64::MAX);
        assert!(matches!(seq.next().await, Err(BackendError::Unavailable(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_allocations_are_distinct() {
        let seq = Arc::new(AtomicSequence::new());
        let handles: Vec<_> = (0..500)
            .map(|_| {
                let seq = seq.clone();
                tokio::spawn(async move { seq.next().await.unwrap() })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }
        assert_eq!(ids.len(), 500);
        assert_eq!(ids.iter().max(), Some(&500));
    }

    #[tokio::test]
    async fn store_rejects_duplicate_keys_but_not_duplicate_urls() {
        let store = MemoryStore::new();
        store
            .save(&MappingRecord::new("https://a.example", MappingKey::Sequence(1)))
            .await
            .unwrap();

        let clash = MappingRecord::new("https://b.example", MappingKey::Sequence(1));
        assert!(matches!(
            store.save(&clash).await,
            Err(BackendError::Conflict(_))
        ));

        store
            .save(&MappingRecord::new("https://a.example", MappingKey::Code("x".into())))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);

        let found = store.find_by_short_code("x").await.unwrap().unwrap();
        assert_eq!(found.long_url, "https://a.example");
        assert!(store.find_by_sequence_id(2).await.unwrap().is_none());
    }
}
