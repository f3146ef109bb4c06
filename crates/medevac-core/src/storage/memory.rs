// ── In-memory store ──
//
// DashMap-backed store for tests and for hosts that fall back to a
// transient session when durable storage is unreachable.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use dashmap::DashMap;

use super::KeyValueStore;
use crate::error::StorageError;

/// Lock-free in-memory [`KeyValueStore`].
///
/// Failure switches let tests simulate an unreachable backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
    reads_unavailable: AtomicBool,
    writes_unavailable: AtomicBool,
    failing_writes: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `get` fail until switched back.
    pub fn set_reads_unavailable(&self, unavailable: bool) {
        self.reads_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every `set` fail until switched back.
    pub fn set_writes_unavailable(&self, unavailable: bool) {
        self.writes_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `count` writes, then recover.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Raw stored value, bypassing failure switches.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    /// Seed a raw value, bypassing failure switches.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn take_write_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.reads_unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                message: format!("read of '{key}' refused"),
            });
        }
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        if self.writes_unavailable.load(Ordering::SeqCst) || self.take_write_failure() {
            return Err(StorageError::Unavailable {
                message: format!("write of '{key}' refused"),
            });
        }
        self.values.insert(key.to_owned(), value);
        Ok(())
    }
}
