use std::sync::Arc;

use futures_util::StreamExt;

use crate::{
    BlobConfig, BlobError, BlobId, BlobKeyStrategy, BlobPut, BlobReader, BlobReceipt, BlobResult,
    BlobStore, ByteRange, ByteStream, DefaultKeyStrategy, ObjectHead, OpenedBlob,
};

/// The main blob adapter - this is what track services embed
#[derive(Clone)]
pub struct BlobAdapter {
    store: Arc<dyn BlobStore>,
    keys: Arc<dyn BlobKeyStrategy>,
    config: BlobConfig,
}

impl BlobAdapter {
    /// Create a new blob adapter
    pub fn new<S: BlobStore + 'static>(store: S, config: BlobConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    /// Create from a store that is already shared
    pub fn from_arc(store: Arc<dyn BlobStore>, config: BlobConfig) -> Self {
        Self {
            store,
            keys: Arc::new(DefaultKeyStrategy::default()),
            config,
        }
    }

    /// Replace the key strategy
    pub fn with_key_strategy<K: BlobKeyStrategy + 'static>(mut self, keys: K) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    /// Store a blob from a stream under a fresh id.
    ///
    /// Bodies larger than `max_blob_bytes` fail with [`BlobError::TooLarge`]
    /// and leave nothing behind.
    pub async fn put(&self, put: BlobPut, body: ByteStream) -> BlobResult<BlobReceipt> {
        let limit = self.config.max_blob_bytes;
        if let Some(size) = put.size_hint {
            if size > limit {
                return Err(BlobError::TooLarge { limit });
            }
        }

        let id = BlobId::new();
        let key = self.keys.object_key(&id);

        let result = match self
            .store
            .put(&key, put.content_type.as_deref(), limit_stream(body, limit))
            .await
        {
            Ok(result) => result,
            Err(err) => {
                if is_limit_error(&err) {
                    return Err(BlobError::TooLarge { limit });
                }
                return Err(err);
            }
        };

        let mut receipt = BlobReceipt::new(id, key, result.size_bytes);
        if let Some(ct) = put.content_type {
            receipt = receipt.with_content_type(ct);
        }
        if let Some(filename) = put.filename {
            receipt = receipt.with_filename(filename);
        }
        if let Some(etag) = result.etag {
            receipt = receipt.with_etag(etag);
        }
        if self.supports_ranges() {
            receipt = receipt.with_range_support();
        }

        tracing::debug!(id = %receipt.id, size = receipt.size_bytes, "blob stored");
        Ok(receipt)
    }

    /// Open a blob positioned at its first byte
    pub async fn open(&self, id: &BlobId) -> BlobResult<OpenedBlob> {
        self.open_at(id, 0).await
    }

    /// Open a blob positioned at `start`.
    ///
    /// Uses the store's native range read when it has one; otherwise reads
    /// from the beginning and skips `start` bytes.
    pub async fn open_at(&self, id: &BlobId, start: u64) -> BlobResult<OpenedBlob> {
        let key = self.keys.object_key(id);

        if start > 0 && self.supports_ranges() {
            let got = self.store.get(&key, Some(ByteRange::from_start(start))).await?;
            return Ok(OpenedBlob {
                reader: BlobReader::at(got.stream, start),
                total_size: got.size_bytes,
                content_type: got.content_type,
                etag: got.etag,
            });
        }

        let got = self.store.get(&key, None).await?;
        let mut reader = BlobReader::new(got.stream);
        if start > 0 {
            reader.skip(start).await?;
        }

        Ok(OpenedBlob {
            reader,
            total_size: got.size_bytes,
            content_type: got.content_type,
            etag: got.etag,
        })
    }

    /// Metadata for a stored blob
    pub async fn head(&self, id: &BlobId) -> BlobResult<ObjectHead> {
        self.store.head(&self.keys.object_key(id)).await
    }

    /// Delete a blob
    pub async fn delete(&self, id: &BlobId) -> BlobResult<()> {
        self.store.delete(&self.keys.object_key(id)).await
    }

    /// Get configuration
    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    /// Check if range requests are served natively
    pub fn supports_ranges(&self) -> bool {
        self.store.capabilities().supports_range
    }
}

/// Raised inside the body stream once the size limit is crossed.
#[derive(Debug, thiserror::Error)]
#[error("blob size limit exceeded")]
struct LimitExceeded;

fn limit_stream(mut body: ByteStream, limit: u64) -> ByteStream {
    Box::pin(async_stream::stream! {
        let mut seen: u64 = 0;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => {
                    seen += chunk.len() as u64;
                    if seen > limit {
                        yield Err(std::io::Error::new(std::io::ErrorKind::InvalidData, LimitExceeded));
                        break;
                    }
                    yield Ok(chunk);
                }
                Err(err) => {
                    yield Err(err);
                    break;
                }
            }
        }
    })
}

fn is_limit_error(err: &BlobError) -> bool {
    match err {
        BlobError::Io { source } => source
            .get_ref()
            .is_some_and(|inner| inner.is::<LimitExceeded>()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FsBlobStore, MemoryBlobStore, ReadOutcome};
    use bytes::Bytes;

    fn body(data: Vec<u8>) -> ByteStream {
        let pieces: Vec<Result<Bytes, std::io::Error>> = data
            .chunks(100)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Box::pin(futures_util::stream::iter(pieces))
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 253) as u8).collect()
    }

    async fn drain(opened: &mut OpenedBlob) -> Vec<u8> {
        let mut out = Vec::new();
        while let ReadOutcome::Data(chunk) = opened.reader.read_chunk(64).await.unwrap() {
            out.extend_from_slice(&chunk);
        }
        out
    }

    #[tokio::test]
    async fn open_at_skips_on_stores_without_ranges() {
        let adapter = BlobAdapter::new(MemoryBlobStore::new().with_chunk_size(7), BlobConfig::new());
        let receipt = adapter
            .put(BlobPut::new().with_content_type("audio/mpeg"), body(sample(1000)))
            .await
            .unwrap();
        assert!(!receipt.accepts_ranges);

        let mut opened = adapter.open_at(&receipt.id, 500).await.unwrap();
        assert_eq!(opened.total_size, 1000);
        assert_eq!(opened.remaining(), 500);
        assert_eq!(opened.content_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(drain(&mut opened).await, sample(1000)[500..].to_vec());
    }

    #[tokio::test]
    async fn open_at_uses_native_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = BlobAdapter::new(FsBlobStore::new(dir.path()), BlobConfig::new());
        let receipt = adapter.put(BlobPut::new(), body(sample(1000))).await.unwrap();
        assert!(receipt.accepts_ranges);

        let mut opened = adapter.open_at(&receipt.id, 250).await.unwrap();
        assert_eq!(opened.reader.position(), 250);
        assert_eq!(drain(&mut opened).await, sample(1000)[250..].to_vec());
    }

    #[tokio::test]
    async fn oversized_uploads_are_rejected() {
        let store = MemoryBlobStore::new();
        let adapter = BlobAdapter::new(store.clone(), BlobConfig::new().with_max_blob_bytes(150));

        let err = adapter.put(BlobPut::new(), body(sample(300))).await.unwrap_err();
        assert!(matches!(err, BlobError::TooLarge { limit: 150 }));
        assert!(store.is_empty().await);

        let err = adapter
            .put(BlobPut::new().with_size_hint(151), body(sample(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn oversized_uploads_to_disk_leave_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = BlobAdapter::new(
            FsBlobStore::new(dir.path()),
            BlobConfig::new().with_max_blob_bytes(150),
        );

        let err = adapter.put(BlobPut::new(), body(sample(300))).await.unwrap_err();
        assert!(matches!(err, BlobError::TooLarge { limit: 150 }));
        let audio = dir.path().join("audio");
        let left = std::fs::read_dir(&audio).map(|d| d.count()).unwrap_or(0);
        assert_eq!(left, 0);
    }

    #[tokio::test]
    async fn body_errors_with_the_limit_text_are_not_size_errors() {
        let adapter = BlobAdapter::new(MemoryBlobStore::new(), BlobConfig::new());
        let failing: ByteStream = Box::pin(futures_util::stream::iter(vec![Err::<Bytes, _>(
            std::io::Error::new(std::io::ErrorKind::InvalidData, "blob size limit exceeded"),
        )]));

        let err = adapter.put(BlobPut::new(), failing).await.unwrap_err();
        assert!(matches!(err, BlobError::Io { .. }));
    }

    #[tokio::test]
    async fn custom_key_prefix_is_used() {
        let store = MemoryBlobStore::new();
        let adapter = BlobAdapter::new(store.clone(), BlobConfig::new())
            .with_key_strategy(DefaultKeyStrategy::new("music"));

        let receipt = adapter.put(BlobPut::new(), body(sample(10))).await.unwrap();
        assert_eq!(receipt.key, format!("music/{}", receipt.id));
        assert_eq!(store.head(&receipt.key).await.unwrap().size_bytes, 10);
    }

    #[tokio::test]
    async fn unknown_blob_is_not_found() {
        let adapter = BlobAdapter::new(MemoryBlobStore::new(), BlobConfig::new());
        let id = BlobId::from_string("missing".into());
        assert!(adapter.open(&id).await.unwrap_err().is_not_found());
        assert!(adapter.head(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_then_open_fails() {
        let adapter = BlobAdapter::new(MemoryBlobStore::new(), BlobConfig::new());
        let receipt = adapter.put(BlobPut::new(), body(sample(10))).await.unwrap();
        adapter.delete(&receipt.id).await.unwrap();
        assert!(adapter.open(&receipt.id).await.unwrap_err().is_not_found());
    }
}
