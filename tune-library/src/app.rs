use std::sync::Arc;

use anyhow::Result;
use tune_blob::{
    BlobAdapter, BlobConfig, BlobStore, DefaultKeyStrategy, FsBlobStore, MemoryBlobStore,
};
use tune_core::TuneConfig;

use crate::settings::{BlobBackend, LibrarySettings};
use crate::store::{MemoryPlaylistStore, MemoryTrackStore, PlaylistStore, TrackStore};

/// Everything a request handler can reach. Built once, shared behind an `Arc`.
pub struct Library {
    pub settings: LibrarySettings,
    pub blobs: BlobAdapter,
    pub tracks: Arc<dyn TrackStore>,
    pub playlists: Arc<dyn PlaylistStore>,
}

impl Library {
    pub fn new(
        settings: LibrarySettings,
        blobs: BlobAdapter,
        tracks: Arc<dyn TrackStore>,
        playlists: Arc<dyn PlaylistStore>,
    ) -> Self {
        Self {
            settings,
            blobs,
            tracks,
            playlists,
        }
    }

    /// Library with in-memory metadata and the configured blob backend.
    pub async fn from_config(config: &TuneConfig) -> Result<Self> {
        let settings = LibrarySettings::from_config(config)?;

        let store: Arc<dyn BlobStore> = match settings.blob_backend {
            BlobBackend::Memory => {
                Arc::new(MemoryBlobStore::new().with_chunk_size(settings.chunk_size))
            }
            BlobBackend::Fs => {
                tokio::fs::create_dir_all(&settings.blob_dir).await?;
                Arc::new(FsBlobStore::new(&settings.blob_dir))
            }
        };

        let blob_config = BlobConfig::new()
            .with_max_blob_bytes(settings.max_blob_bytes)
            .with_chunk_size(settings.chunk_size);

        tracing::info!(
            backend = ?settings.blob_backend,
            chunk_size = settings.chunk_size,
            max_blob_bytes = settings.max_blob_bytes,
            key_prefix = %settings.blob_key_prefix,
            "blob storage configured"
        );

        let blobs = BlobAdapter::from_arc(store, blob_config)
            .with_key_strategy(DefaultKeyStrategy::new(settings.blob_key_prefix.clone()));

        Ok(Self::new(
            settings,
            blobs,
            Arc::new(MemoryTrackStore::new()),
            Arc::new(MemoryPlaylistStore::new()),
        ))
    }
}
