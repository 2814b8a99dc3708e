use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tune_blob::BlobId;

pub const DEFAULT_AUDIO_TYPE: &str = "audio/mpeg";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub release_year: i32,
    /// Seconds.
    #[serde(default)]
    pub duration: u32,
    pub blob: BlobId,
    /// Byte length of the blob when known at upload time.
    pub size_bytes: Option<u64>,
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Descriptive fields supplied when a track is uploaded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackInfo {
    pub title: Option<String>,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub release_year: i32,
    #[serde(default)]
    pub duration: u32,
}

/// Partial track edit; blank strings and a zero year leave the field as is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackUpdate {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub release_year: i32,
}

impl TrackUpdate {
    pub fn apply(self, track: &mut Track) {
        fn replace(field: &mut String, value: String) {
            let value = value.trim();
            if !value.is_empty() {
                *field = value.to_string();
            }
        }
        replace(&mut track.title, self.title);
        replace(&mut track.artist, self.artist);
        replace(&mut track.album, self.album);
        replace(&mut track.genre, self.genre);
        if self.release_year != 0 {
            track.release_year = self.release_year;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub album_cover: Option<String>,
    pub track_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPlaylist {
    pub title: String,
    #[serde(default)]
    pub album_cover: Option<String>,
    #[serde(default)]
    pub track_ids: Vec<String>,
}

/// Partial playlist edit. `track_ids`, when present, replaces the list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub album_cover: Option<String>,
    #[serde(default)]
    pub track_ids: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        Track {
            id: "t".into(),
            title: "Old".into(),
            artist: "Someone".into(),
            album: "First".into(),
            genre: "rock".into(),
            release_year: 1990,
            duration: 10,
            blob: BlobId::from_string("b".into()),
            size_bytes: None,
            content_type: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut t = track();
        let update: TrackUpdate =
            serde_json::from_str(r#"{"title": " New ", "genre": "", "release_year": 0}"#).unwrap();
        update.apply(&mut t);

        assert_eq!(t.title, "New");
        assert_eq!(t.artist, "Someone");
        assert_eq!(t.genre, "rock");
        assert_eq!(t.release_year, 1990);
    }

    #[test]
    fn empty_update_changes_nothing() {
        let before = track();
        let mut t = before.clone();
        TrackUpdate::default().apply(&mut t);
        assert_eq!(t, before);
    }
}
