use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio::sync::RwLock;

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::store::{BlobStore, GetResult, ObjectHead, PutResult, StoreCapabilities};
use crate::{BlobError, BlobResult, ByteRange, ByteStream};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
    etag: String,
    last_modified: i64,
}

/// In-memory blob store.
///
/// Objects are handed back in pieces of `chunk_size` bytes. Range reads are
/// not supported, so callers reach an offset by skipping.
#[derive(Clone)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    chunk_size: usize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Size of the pieces emitted by `get`. Zero is ignored.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        if chunk_size > 0 {
            self.chunk_size = chunk_size;
        }
        self
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        mut stream: ByteStream,
    ) -> BlobResult<PutResult> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }

        let data = buf.freeze();
        let size_bytes = data.len() as u64;
        let etag = format!("\"{:x}-{}\"", size_bytes, uuid::Uuid::new_v4().simple());

        let object = StoredObject {
            data,
            content_type: content_type.map(str::to_string),
            etag: etag.clone(),
            last_modified: chrono::Utc::now().timestamp(),
        };
        self.objects.write().await.insert(key.to_string(), object);

        Ok(PutResult {
            etag: Some(etag),
            size_bytes,
        })
    }

    async fn get(&self, key: &str, range: Option<ByteRange>) -> BlobResult<GetResult> {
        if range.is_some() {
            return Err(BlobError::Unsupported);
        }

        let object = self
            .objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::not_found(key))?;

        let pieces: Vec<Result<Bytes, std::io::Error>> = object
            .data
            .chunks(self.chunk_size)
            .map(|c| Ok(object.data.slice_ref(c)))
            .collect();

        Ok(GetResult {
            stream: Box::pin(futures_util::stream::iter(pieces)),
            size_bytes: object.data.len() as u64,
            content_type: object.content_type,
            etag: Some(object.etag),
            resolved_range: None,
        })
    }

    async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
        let objects = self.objects.read().await;
        let object = objects.get(key).ok_or_else(|| BlobError::not_found(key))?;
        Ok(ObjectHead {
            size_bytes: object.data.len() as u64,
            content_type: object.content_type.clone(),
            etag: Some(object.etag.clone()),
            last_modified: Some(object.last_modified),
        })
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        match self.objects.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(BlobError::not_found(key)),
        }
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic()
    }
}
