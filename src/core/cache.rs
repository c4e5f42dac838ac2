// src/core/cache.rs

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::matrix::MajorAxis;
use crate::error::DafError;

/// Identity of a derived artifact for version counting and memoization.
/// Every mutation bumps the counters of the keys it may affect; cached
/// entries remember the counter they were computed against and are lazily
/// recomputed when it moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataKey {
    ScalarNames,
    AxisNames,
    AxisEntries(String),
    VectorNames(String),
    Vector {
        axis: String,
        name: String,
    },
    MatrixNames {
        rows: String,
        cols: String,
    },
    Matrix {
        rows: String,
        cols: String,
        name: String,
        major: MajorAxis,
    },
}

/// Per-dataset version counters. Counters start at 1 so freshly opened
/// datasets never match a cache entry computed before a restart.
#[derive(Debug, Default)]
pub struct VersionCounters {
    counters: Mutex<HashMap<DataKey, u32>>,
}

impl VersionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &DataKey) -> u32 {
        self.counters.lock().get(key).copied().unwrap_or(1)
    }

    pub fn bump(&self, key: &DataKey) {
        let mut counters = self.counters.lock();
        let counter = counters.entry(key.clone()).or_insert(1);
        *counter = counter.wrapping_add(1);
    }
}

struct CacheEntry {
    version: u32,
    value: Arc<dyn Any + Send + Sync>,
}

/// Memoization of derived values keyed by `DataKey`, invalidated lazily by
/// version counter comparison.
#[derive(Default)]
pub struct DataCache {
    entries: Mutex<HashMap<DataKey, CacheEntry>>,
}

impl std::fmt::Debug for DataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCache")
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

impl DataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the cached value for `key` if it was computed against
    /// `version`; otherwise computes, stores and returns it.
    pub fn get_or_compute<T, F>(
        &self,
        key: &DataKey,
        version: u32,
        compute: F,
    ) -> Result<Arc<T>, DafError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<Arc<T>, DafError>,
    {
        {
            let entries = self.entries.lock();
            if let Some(entry) = entries.get(key) {
                if entry.version == version {
                    if let Ok(value) = Arc::downcast::<T>(Arc::clone(&entry.value)) {
                        return Ok(value);
                    }
                }
            }
        }
        let value = compute()?;
        let mut entries = self.entries.lock();
        entries.insert(
            key.clone(),
            CacheEntry {
                version,
                value: Arc::clone(&value) as Arc<dyn Any + Send + Sync>,
            },
        );
        Ok(value)
    }

    /// Infallible variant of [`DataCache::get_or_compute`] for derived
    /// values whose computation cannot fail (name sets).
    pub fn get_or_insert_with<T, F>(&self, key: &DataKey, version: u32, compute: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Arc<T>,
    {
        {
            let entries = self.entries.lock();
            if let Some(entry) = entries.get(key) {
                if entry.version == version {
                    if let Ok(value) = Arc::downcast::<T>(Arc::clone(&entry.value)) {
                        return value;
                    }
                }
            }
        }
        let value = compute();
        let mut entries = self.entries.lock();
        entries.insert(
            key.clone(),
            CacheEntry {
                version,
                value: Arc::clone(&value) as Arc<dyn Any + Send + Sync>,
            },
        );
        value
    }

    pub fn evict(&self, key: &DataKey) {
        self.entries.lock().remove(key);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
