use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_TYPE, RANGE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use futures_util::TryStreamExt;
use tune_axum::TuneAxumError;
use tune_blob::{BlobPut, ByteStream};
use tune_core::errors::TuneError;

use super::LibraryState;
use crate::errors::from_blob;
use crate::models::{Track, TrackInfo, TrackUpdate};
use crate::streaming::{open_stream, StreamError};

/// `GET /tracks/{id}/stream`
pub async fn stream(
    State(state): State<LibraryState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StreamError> {
    // Undecodable bytes stay in the value so parsing fails closed
    let range = headers
        .get(RANGE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let opened = open_stream(&state, &id, range.as_deref()).await?;
    let settings = &state.settings;
    Ok(opened.into_response(settings.chunk_size, settings.full_status))
}

/// `GET /tracks/{id}`
pub async fn find(
    State(state): State<LibraryState>,
    Path(id): Path<String>,
) -> Result<Json<Track>, TuneAxumError> {
    let track = state.tracks.find_track(&id).await.map_err(TuneError::from)?;
    Ok(Json(track))
}

/// `POST /tracks?title=..&artist=..` with the raw audio as the body.
pub async fn create(
    State(state): State<LibraryState>,
    query: Result<Query<TrackInfo>, QueryRejection>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<Track>), TuneAxumError> {
    let Query(info) = query.map_err(|rejection| TuneError::bad_request(rejection.body_text()))?;
    let title = info
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TuneError::bad_request("title is required"))?
        .to_string();

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| ct.starts_with("audio/"))
        .map(str::to_string);

    let mut put = BlobPut::new().with_filename(title.clone());
    if let Some(ct) = &content_type {
        put = put.with_content_type(ct.clone());
    }

    let stream: ByteStream = Box::pin(body.into_data_stream().map_err(std::io::Error::other));
    let receipt = state.blobs.put(put, stream).await.map_err(from_blob)?;

    if receipt.size_bytes == 0 {
        if let Err(err) = state.blobs.delete(&receipt.id).await {
            tracing::warn!(blob = %receipt.id, error = %err, "failed to remove empty upload");
        }
        return Err(TuneError::bad_request("audio body is empty").into());
    }

    let now = chrono::Utc::now();
    let track = Track {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        artist: info.artist,
        album: info.album,
        genre: info.genre,
        release_year: info.release_year,
        duration: info.duration,
        blob: receipt.id,
        size_bytes: Some(receipt.size_bytes),
        content_type,
        created_at: now,
        updated_at: now,
    };

    let track = state.tracks.insert_track(track).await.map_err(TuneError::from)?;
    tracing::info!(track_id = %track.id, size = receipt.size_bytes, "track uploaded");
    Ok((StatusCode::CREATED, Json(track)))
}

/// `PATCH /tracks/{id}`
pub async fn update(
    State(state): State<LibraryState>,
    Path(id): Path<String>,
    payload: Result<Json<TrackUpdate>, JsonRejection>,
) -> Result<Json<Track>, TuneAxumError> {
    let mut track = state.tracks.find_track(&id).await.map_err(TuneError::from)?;
    let Json(update) = payload.map_err(|rejection| TuneError::bad_request(rejection.body_text()))?;

    update.apply(&mut track);
    track.updated_at = chrono::Utc::now();

    let track = state.tracks.update_track(track).await.map_err(TuneError::from)?;
    tracing::info!(track_id = %track.id, "track updated");
    Ok(Json(track))
}

/// `DELETE /tracks/{id}`
pub async fn remove(
    State(state): State<LibraryState>,
    Path(id): Path<String>,
) -> Result<StatusCode, TuneAxumError> {
    let track = state.tracks.delete_track(&id).await.map_err(TuneError::from)?;

    match state.blobs.delete(&track.blob).await {
        Ok(()) => {}
        Err(err) if err.is_not_found() => {
            tracing::warn!(track_id = %id, blob = %track.blob, "track had no stored audio");
        }
        Err(err) => return Err(from_blob(err).into()),
    }

    tracing::info!(track_id = %id, "track deleted");
    Ok(StatusCode::NO_CONTENT)
}
