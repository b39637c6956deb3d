//! Process-lifetime cache of built vector indices, keyed by video ID.
//!
//! Entries are bounded by an LRU policy. Builds for the same key are
//! serialized so concurrent requests for an uncached video run the pipeline
//! once and share the result.

use crate::error::Result;
use crate::vector_store::VectorIndex;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// A cached index with build metadata.
#[derive(Clone)]
struct CacheEntry {
    index: Arc<VectorIndex>,
    built_at: DateTime<Utc>,
}

/// Summary of a cached index.
#[derive(Debug, Clone, Serialize)]
pub struct CachedVideo {
    pub video_id: String,
    pub chunk_count: usize,
    pub built_at: DateTime<Utc>,
}

/// Video ID → vector index cache.
pub struct IndexCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    building: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IndexCache {
    /// Create a cache holding at most `max_entries` indices (0 = unbounded).
    pub fn new(max_entries: usize) -> Self {
        let entries = match NonZeroUsize::new(max_entries) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };

        Self {
            entries: Mutex::new(entries),
            building: Mutex::new(HashMap::new()),
        }
    }

    /// Look up an index, marking it as recently used.
    pub fn get(&self, video_id: &str) -> Option<Arc<VectorIndex>> {
        self.entries.lock().get(video_id).map(|e| e.index.clone())
    }

    /// Whether an index is cached, without touching recency.
    pub fn contains(&self, video_id: &str) -> bool {
        self.entries.lock().contains(video_id)
    }

    /// Store an index, evicting the least recently used entry when full.
    pub fn insert(&self, video_id: &str, index: Arc<VectorIndex>) {
        let entry = CacheEntry {
            index,
            built_at: Utc::now(),
        };
        if let Some((evicted, _)) = self.entries.lock().push(video_id.to_string(), entry) {
            if evicted != video_id {
                debug!("Evicted index for {} from cache", evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Cached videos, most recently used first.
    pub fn entries(&self) -> Vec<CachedVideo> {
        self.entries
            .lock()
            .iter()
            .map(|(video_id, entry)| CachedVideo {
                video_id: video_id.clone(),
                chunk_count: entry.index.len(),
                built_at: entry.built_at,
            })
            .collect()
    }

    /// Return the cached index for `video_id`, or run `build` and cache its
    /// result.
    ///
    /// At most one build per key runs at a time; callers that waited on a
    /// successful build get its index. Failed builds are not cached.
    pub async fn get_or_try_build<F, Fut>(&self, video_id: &str, build: F) -> Result<Arc<VectorIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VectorIndex>>,
    {
        if let Some(index) = self.get(video_id) {
            debug!("Cache hit for {}", video_id);
            return Ok(index);
        }

        let gate = self
            .building
            .lock()
            .entry(video_id.to_string())
            .or_default()
            .clone();
        // Declared before the guard so the lock is released first.
        let release = GateRelease {
            cache: self,
            video_id,
            gate,
        };
        let _guard = release.gate.lock().await;

        if let Some(index) = self.get(video_id) {
            return Ok(index);
        }

        build().await.map(|index| {
            let index = Arc::new(index);
            self.insert(video_id, index.clone());
            index
        })
    }

    fn release_gate(&self, video_id: &str, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut building = self.building.lock();
        // Only the map and this caller hold the gate: nobody else is waiting.
        if Arc::strong_count(gate) == 2 {
            building.remove(video_id);
        }
    }
}

/// Drops the build gate for a key when its caller finishes or is cancelled.
struct GateRelease<'a> {
    cache: &'a IndexCache,
    video_id: &'a str,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for GateRelease<'_> {
    fn drop(&mut self) {
        self.cache.release_gate(self.video_id, &self.gate);
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(0)
    }
}
