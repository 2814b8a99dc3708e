use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tune_axum::TuneAxumError;
use tune_core::errors::TuneError;

use super::LibraryState;
use crate::models::{NewPlaylist, Playlist, PlaylistUpdate, Track};

pub const M3U_CONTENT_TYPE: &str = "audio/x-mpegurl";

/// Extended M3U listing; each entry points at the track's stream route.
pub fn render_m3u(api_prefix: &str, tracks: &[Track]) -> String {
    let base = format!("{}/tracks", api_prefix.trim_end_matches('/'));
    let mut out = String::from("#EXTM3U\n");
    for track in tracks {
        out.push_str(&format!(
            "#EXTINF:{},{} - {}\n",
            track.duration,
            single_line(&track.artist),
            single_line(&track.title)
        ));
        out.push_str(&format!("{base}/{}/stream\n", track.id));
    }
    out
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

/// `GET /playlists/{id}/stream`; the id may carry a `.m3u` suffix.
pub async fn stream_m3u(
    State(state): State<LibraryState>,
    Path(id): Path<String>,
) -> Result<Response, TuneAxumError> {
    let id = id.strip_suffix(".m3u").unwrap_or(&id);

    let playlist = state.playlists.find_playlist(id).await.map_err(TuneError::from)?;
    let tracks = state
        .tracks
        .find_many(&playlist.track_ids)
        .await
        .map_err(TuneError::from)?;

    if tracks.len() < playlist.track_ids.len() {
        tracing::debug!(
            playlist_id = %playlist.id,
            skipped = playlist.track_ids.len() - tracks.len(),
            "playlist references missing tracks"
        );
    }

    let body = render_m3u(&state.settings.api_prefix, &tracks);
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"playlist_{}.m3u\"",
        playlist.id
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(M3U_CONTENT_TYPE)),
            (CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// `GET /playlists/{id}`
pub async fn find(
    State(state): State<LibraryState>,
    Path(id): Path<String>,
) -> Result<Json<Playlist>, TuneAxumError> {
    let playlist = state.playlists.find_playlist(&id).await.map_err(TuneError::from)?;
    Ok(Json(playlist))
}

/// `POST /playlists`
pub async fn create(
    State(state): State<LibraryState>,
    payload: Result<Json<NewPlaylist>, JsonRejection>,
) -> Result<(StatusCode, Json<Playlist>), TuneAxumError> {
    let Json(new) = payload.map_err(|rejection| TuneError::bad_request(rejection.body_text()))?;

    let title = new.title.trim();
    if title.is_empty() {
        return Err(TuneError::bad_request("title is required").into());
    }

    require_tracks(&state, &new.track_ids).await?;

    let now = chrono::Utc::now();
    let playlist = Playlist {
        id: uuid::Uuid::new_v4().to_string(),
        title: title.to_string(),
        album_cover: new.album_cover,
        track_ids: new.track_ids,
        created_at: now,
        updated_at: now,
    };
    let playlist = state
        .playlists
        .insert_playlist(playlist)
        .await
        .map_err(TuneError::from)?;

    tracing::info!(playlist_id = %playlist.id, tracks = playlist.track_ids.len(), "playlist created");
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// `PATCH /playlists/{id}`
pub async fn update(
    State(state): State<LibraryState>,
    Path(id): Path<String>,
    payload: Result<Json<PlaylistUpdate>, JsonRejection>,
) -> Result<Json<Playlist>, TuneAxumError> {
    let mut playlist = state.playlists.find_playlist(&id).await.map_err(TuneError::from)?;
    let Json(update) = payload.map_err(|rejection| TuneError::bad_request(rejection.body_text()))?;

    if let Some(title) = update.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(TuneError::bad_request("title cannot be empty").into());
        }
        playlist.title = title.to_string();
    }
    if let Some(cover) = update.album_cover {
        playlist.album_cover = Some(cover).filter(|c| !c.trim().is_empty());
    }
    if let Some(track_ids) = update.track_ids {
        require_tracks(&state, &track_ids).await?;
        playlist.track_ids = track_ids;
    }
    playlist.updated_at = chrono::Utc::now();

    let playlist = state
        .playlists
        .update_playlist(playlist)
        .await
        .map_err(TuneError::from)?;
    tracing::info!(playlist_id = %playlist.id, "playlist updated");
    Ok(Json(playlist))
}

/// `DELETE /playlists/{id}`; the tracks themselves are kept.
pub async fn remove(
    State(state): State<LibraryState>,
    Path(id): Path<String>,
) -> Result<StatusCode, TuneAxumError> {
    state.playlists.delete_playlist(&id).await.map_err(TuneError::from)?;
    tracing::info!(playlist_id = %id, "playlist deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Fails with 400 and the list of missing ids unless every track exists.
async fn require_tracks(state: &LibraryState, track_ids: &[String]) -> Result<(), TuneError> {
    let found = state
        .tracks
        .find_many(track_ids)
        .await
        .map_err(TuneError::from)?;
    let missing: Vec<&String> = track_ids
        .iter()
        .filter(|id| !found.iter().any(|t| &t.id == *id))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(TuneError::bad_request("unknown track ids").with_data(json!({ "missing": missing })))
    }
}
