//! Storage for synthesized audio payloads.
//!
//! Synthesis responses return a URL instead of inlining audio bytes; the
//! bytes live in an [`ObjectStore`] and are served from the file retrieval
//! endpoint. Stored audio is transient: the in-memory store is bounded and
//! expires entries, so download URLs are not durable.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::Serialize;
use uuid::Uuid;

const DEFAULT_MAX_OBJECTS: u64 = 512;
const DEFAULT_OBJECT_TTL: Duration = Duration::from_secs(3600);

/// Metadata for a stored object.
#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub file_id: String,
    pub url: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

/// Byte storage seam. The in-memory store is the default; an S3-style
/// implementation slots in here without touching the orchestrator.
pub trait ObjectStore: Send + Sync {
    /// Persists a payload and returns its retrieval metadata.
    fn put(&self, bytes: Bytes, content_type: &str) -> StoredObject;

    /// Retrieves a stored payload with its metadata.
    fn get(&self, file_id: &str) -> Option<(StoredObject, Bytes)>;
}

pub struct MemoryObjectStore {
    base_url: String,
    objects: Cache<String, (StoredObject, Bytes)>,
}

impl MemoryObjectStore {
    /// `base_url` is the externally reachable server origin, e.g.
    /// `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Arc<Self> {
        Self::with_limits(base_url, DEFAULT_MAX_OBJECTS, DEFAULT_OBJECT_TTL)
    }

    /// Store with explicit capacity and retention, for tests and deployments
    /// with unusual synthesis volume.
    pub fn with_limits(
        base_url: impl Into<String>,
        max_objects: u64,
        ttl: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Cache::builder()
                .max_capacity(max_objects)
                .time_to_live(ttl)
                .build(),
        })
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, bytes: Bytes, content_type: &str) -> StoredObject {
        let file_id = Uuid::new_v4().to_string();
        let object = StoredObject {
            url: format!("{}/v1/files/{file_id}", self.base_url),
            file_id: file_id.clone(),
            size_bytes: bytes.len() as u64,
            content_type: content_type.to_string(),
            created_at: Utc::now(),
        };
        self.objects.insert(file_id, (object.clone(), bytes));
        object
    }

    fn get(&self, file_id: &str) -> Option<(StoredObject, Bytes)> {
        self.objects.get(file_id)
    }
}
