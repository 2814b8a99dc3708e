use async_trait::async_trait;

use crate::{BlobId, BlobResult, ByteRange, ByteStream};

/// Core blob storage operations - must be implemented by all storage backends
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob from a stream
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        stream: ByteStream,
    ) -> BlobResult<PutResult>;

    /// Get a blob as a stream.
    ///
    /// A range may only be passed when [`StoreCapabilities::supports_range`]
    /// is set; other stores answer [`crate::BlobError::Unsupported`].
    async fn get(&self, key: &str, range: Option<ByteRange>) -> BlobResult<GetResult>;

    /// Get blob metadata without content
    async fn head(&self, key: &str) -> BlobResult<ObjectHead>;

    /// Delete a blob
    async fn delete(&self, key: &str) -> BlobResult<()>;

    /// Get store capabilities
    fn capabilities(&self) -> StoreCapabilities;
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub etag: Option<String>,
    pub size_bytes: u64,
}

/// Result of a get operation
pub struct GetResult {
    pub stream: ByteStream,
    /// Size of the whole object, not of the returned range.
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub resolved_range: Option<ResolvedRange>,
}

impl std::fmt::Debug for GetResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetResult")
            .field("size_bytes", &self.size_bytes)
            .field("content_type", &self.content_type)
            .field("etag", &self.etag)
            .field("resolved_range", &self.resolved_range)
            .finish()
    }
}

/// Metadata about a blob
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<i64>,
}

/// Range a store actually served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
}

impl ResolvedRange {
    pub fn from_request(range: &ByteRange, total_size: u64) -> Self {
        let last = total_size.saturating_sub(1);
        Self {
            start: range.start,
            end: range.end.unwrap_or(last).min(last),
            total_size,
        }
    }

    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Store capabilities
#[derive(Debug, Clone, Default)]
pub struct StoreCapabilities {
    pub supports_range: bool,
}

impl StoreCapabilities {
    pub fn basic() -> Self {
        Self {
            supports_range: false,
        }
    }

    pub fn with_range(mut self) -> Self {
        self.supports_range = true;
        self
    }
}

/// Strategy for mapping blob ids to storage keys
pub trait BlobKeyStrategy: Send + Sync {
    /// Key under which the blob content lives. Must be stable for an id.
    fn object_key(&self, id: &BlobId) -> String;
}

/// Default key strategy: `<prefix>/<blob_id>`
#[derive(Debug, Clone)]
pub struct DefaultKeyStrategy {
    prefix: String,
}

impl DefaultKeyStrategy {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for DefaultKeyStrategy {
    fn default() -> Self {
        Self::new("audio")
    }
}

impl BlobKeyStrategy for DefaultKeyStrategy {
    fn object_key(&self, id: &BlobId) -> String {
        if self.prefix.is_empty() {
            id.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), id)
        }
    }
}
