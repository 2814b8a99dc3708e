use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::store::{BlobStore, GetResult, ObjectHead, PutResult, ResolvedRange, StoreCapabilities};
use crate::{BlobError, BlobResult, ByteRange, ByteStream};

const META_SUFFIX: &str = ".meta.json";

/// Sidecar stored next to each blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlobMeta {
    content_type: Option<String>,
    etag: String,
}

/// Blob store backed by a directory.
///
/// Keys map to relative paths under `root`. Writes go to a temporary file
/// that is renamed into place once complete, so readers never see a partial
/// blob. Supports native range reads by seeking.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    read_buffer: usize,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_buffer: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> BlobResult<PathBuf> {
        let rel = Path::new(key);
        if key.is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(BlobError::invalid(format!("invalid blob key: {key}")));
        }
        Ok(self.root.join(rel))
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(META_SUFFIX);
        PathBuf::from(name)
    }

    async fn read_meta(path: &Path) -> BlobResult<Option<BlobMeta>> {
        match fs::read(Self::meta_path(path)).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        mut stream: ByteStream,
    ) -> BlobResult<PutResult> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        let mut file = fs::File::create(&tmp).await?;
        let mut size_bytes: u64 = 0;

        let written: BlobResult<()> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                size_bytes += chunk.len() as u64;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok::<(), BlobError>(())
        }
        .await;

        drop(file);
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(err);
        }

        let etag = format!("\"{:x}-{}\"", size_bytes, uuid::Uuid::new_v4().simple());
        let meta = BlobMeta {
            content_type: content_type.map(str::to_string),
            etag: etag.clone(),
        };
        let meta_path = Self::meta_path(&path);

        let committed = async {
            fs::write(&meta_path, serde_json::to_vec(&meta)?).await?;
            fs::rename(&tmp, &path).await?;
            Ok::<(), BlobError>(())
        }
        .await;

        if let Err(err) = committed {
            let _ = fs::remove_file(&tmp).await;
            let _ = fs::remove_file(&meta_path).await;
            return Err(err);
        }

        tracing::debug!(key, size_bytes, "stored blob on disk");
        Ok(PutResult {
            etag: Some(etag),
            size_bytes,
        })
    }

    async fn get(&self, key: &str, range: Option<ByteRange>) -> BlobResult<GetResult> {
        let path = self.path_for(key)?;
        let mut file = fs::File::open(&path)
            .await
            .map_err(|err| BlobError::from_io(key, err))?;
        let size_bytes = file.metadata().await?.len();
        let meta = Self::read_meta(&path).await?;

        let (stream, resolved_range) = match range {
            None => {
                let stream: ByteStream =
                    Box::pin(ReaderStream::with_capacity(file, self.read_buffer));
                (stream, None)
            }
            Some(range) => {
                if range.start >= size_bytes {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("offset {} is past the end of {key}", range.start),
                    )
                    .into());
                }
                if !range.is_valid(size_bytes) {
                    return Err(BlobError::invalid(format!(
                        "range {}-{:?} outside blob of {size_bytes} bytes",
                        range.start, range.end
                    )));
                }
                let resolved = ResolvedRange::from_request(&range, size_bytes);
                file.seek(SeekFrom::Start(resolved.start)).await?;
                let limited = file.take(resolved.content_length());
                let stream: ByteStream =
                    Box::pin(ReaderStream::with_capacity(limited, self.read_buffer));
                (stream, Some(resolved))
            }
        };

        Ok(GetResult {
            stream,
            size_bytes,
            content_type: meta.as_ref().and_then(|m| m.content_type.clone()),
            etag: meta.map(|m| m.etag),
            resolved_range,
        })
    }

    async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
        let path = self.path_for(key)?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|err| BlobError::from_io(key, err))?;
        let meta = Self::read_meta(&path).await?;

        let last_modified = metadata
            .modified()
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp());

        Ok(ObjectHead {
            size_bytes: metadata.len(),
            content_type: meta.as_ref().and_then(|m| m.content_type.clone()),
            etag: meta.map(|m| m.etag),
            last_modified,
        })
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let path = self.path_for(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|err| BlobError::from_io(key, err))?;
        if let Err(err) = fs::remove_file(Self::meta_path(&path)).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(key, error = %err, "failed to remove blob sidecar");
            }
        }
        Ok(())
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::basic().with_range()
    }
}
