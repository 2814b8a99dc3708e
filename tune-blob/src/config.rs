/// Default copy chunk (32 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Configuration for blob operations
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Absolute max size allowed for a single blob
    pub max_blob_bytes: u64,

    /// Largest chunk moved per read/write when streaming a blob out
    pub chunk_size: usize,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            max_blob_bytes: 200 * 1024 * 1024, // 200MB
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max blob size
    pub fn with_max_blob_bytes(mut self, bytes: u64) -> Self {
        self.max_blob_bytes = bytes;
        self
    }

    /// Set the streaming chunk size. Zero is ignored.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        if bytes > 0 {
            self.chunk_size = bytes;
        }
        self
    }
}
