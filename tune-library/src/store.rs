//! Track and playlist metadata stores.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{Playlist, Track};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} {id} already exists")]
    Conflict { entity: &'static str, id: String },

    #[error("metadata store failure: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn track_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "track",
            id: id.into(),
        }
    }

    pub fn playlist_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "playlist",
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TrackStore: Send + Sync {
    async fn find_track(&self, id: &str) -> StoreResult<Track>;

    async fn insert_track(&self, track: Track) -> StoreResult<Track>;

    /// Replace an existing track record.
    async fn update_track(&self, track: Track) -> StoreResult<Track>;

    async fn delete_track(&self, id: &str) -> StoreResult<Track>;

    /// Tracks in the order of `ids`; unknown ids are left out.
    async fn find_many(&self, ids: &[String]) -> StoreResult<Vec<Track>>;
}

#[async_trait]
pub trait PlaylistStore: Send + Sync {
    async fn find_playlist(&self, id: &str) -> StoreResult<Playlist>;

    async fn insert_playlist(&self, playlist: Playlist) -> StoreResult<Playlist>;

    /// Replace an existing playlist record.
    async fn update_playlist(&self, playlist: Playlist) -> StoreResult<Playlist>;

    async fn delete_playlist(&self, id: &str) -> StoreResult<Playlist>;
}

#[derive(Clone, Default)]
pub struct MemoryTrackStore {
    tracks: Arc<RwLock<HashMap<String, Track>>>,
}

impl MemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackStore for MemoryTrackStore {
    async fn find_track(&self, id: &str) -> StoreResult<Track> {
        self.tracks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::track_not_found(id))
    }

    async fn insert_track(&self, track: Track) -> StoreResult<Track> {
        let mut tracks = self.tracks.write().await;
        if tracks.contains_key(&track.id) {
            return Err(StoreError::Conflict {
                entity: "track",
                id: track.id,
            });
        }
        tracks.insert(track.id.clone(), track.clone());
        Ok(track)
    }

    async fn update_track(&self, track: Track) -> StoreResult<Track> {
        let mut tracks = self.tracks.write().await;
        match tracks.get_mut(&track.id) {
            Some(slot) => {
                *slot = track.clone();
                Ok(track)
            }
            None => Err(StoreError::track_not_found(track.id)),
        }
    }

    async fn delete_track(&self, id: &str) -> StoreResult<Track> {
        self.tracks
            .write()
            .await
            .remove(id)
            .ok_or_else(|| StoreError::track_not_found(id))
    }

    async fn find_many(&self, ids: &[String]) -> StoreResult<Vec<Track>> {
        let tracks = self.tracks.read().await;
        Ok(ids.iter().filter_map(|id| tracks.get(id).cloned()).collect())
    }
}

#[derive(Clone, Default)]
pub struct MemoryPlaylistStore {
    playlists: Arc<RwLock<HashMap<String, Playlist>>>,
}

impl MemoryPlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlaylistStore for MemoryPlaylistStore {
    async fn find_playlist(&self, id: &str) -> StoreResult<Playlist> {
        self.playlists
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::playlist_not_found(id))
    }

    async fn insert_playlist(&self, playlist: Playlist) -> StoreResult<Playlist> {
        let mut playlists = self.playlists.write().await;
        if playlists.contains_key(&playlist.id) {
            return Err(StoreError::Conflict {
                entity: "playlist",
                id: playlist.id,
            });
        }
        playlists.insert(playlist.id.clone(), playlist.clone());
        Ok(playlist)
    }

    async fn update_playlist(&self, playlist: Playlist) -> StoreResult<Playlist> {
        let mut playlists = self.playlists.write().await;
        match playlists.get_mut(&playlist.id) {
            Some(slot) => {
                *slot = playlist.clone();
                Ok(playlist)
            }
            None => Err(StoreError::playlist_not_found(playlist.id)),
        }
    }

    async fn delete_playlist(&self, id: &str) -> StoreResult<Playlist> {
        self.playlists
            .write()
            .await
            .remove(id)
            .ok_or_else(|| StoreError::playlist_not_found(id))
    }
}
