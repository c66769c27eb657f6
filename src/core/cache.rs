//! Transcription result cache.
//!
//! Keys are derived from a cheap fingerprint of the audio payload's shape
//! (byte size, MIME type, resolved provider) rather than full content
//! hashing, and are namespaced per agent so one agent's purge never touches
//! another's entries. TTL is tracked per entry since each agent configures
//! its own retention.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::future::Cache;
use serde::Serialize;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_128;

use crate::config::settings::ProviderId;

const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// A transcription retained for reuse.
#[derive(Debug, Clone)]
pub struct CachedTranscript {
    pub text: String,
    pub confidence: f32,
    expires_at: Instant,
}

impl CachedTranscript {
    fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Running totals for the cache, exported on the metrics surface.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
}

pub struct TranscriptCache {
    entries: Cache<String, Arc<CachedTranscript>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

impl TranscriptCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries.max(1))
                .support_invalidation_closures()
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
        }
    }

    /// Fingerprint of the payload shape used as the cache discriminator.
    pub fn fingerprint(byte_size: usize, mime_type: &str, provider: ProviderId) -> u128 {
        let mut material = Vec::with_capacity(mime_type.len() + 32);
        material.extend_from_slice(&(byte_size as u64).to_le_bytes());
        material.push(0);
        material.extend_from_slice(mime_type.as_bytes());
        material.push(0);
        material.extend_from_slice(provider.as_str().as_bytes());
        xxh3_128(&material)
    }

    fn key(agent_id: &str, fingerprint: u128) -> String {
        format!("{agent_id}:{fingerprint:032x}")
    }

    pub async fn lookup(&self, agent_id: &str, fingerprint: u128) -> Option<CachedTranscript> {
        let key = Self::key(agent_id, fingerprint);
        match self.entries.get(&key).await {
            Some(entry) if !entry.expired() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(agent_id, "transcript cache hit");
                Some(entry.as_ref().clone())
            }
            Some(_) => {
                // Expired under its per-agent TTL; drop eagerly.
                self.entries.invalidate(&key).await;
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn store(
        &self,
        agent_id: &str,
        fingerprint: u128,
        text: impl Into<String>,
        confidence: f32,
        ttl: Duration,
    ) {
        let entry = Arc::new(CachedTranscript {
            text: text.into(),
            confidence,
            expires_at: Instant::now() + ttl,
        });
        self.entries.insert(Self::key(agent_id, fingerprint), entry).await;
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    /// Invalidates every entry belonging to one agent.
    pub fn purge_agent(&self, agent_id: &str) {
        let prefix = format!("{agent_id}:");
        // Closure invalidation runs lazily inside moka; entries become
        // unobservable immediately.
        let _ = self
            .entries
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix));
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
        }
    }
}

impl Default for TranscriptCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
