//! Serving a track as a ranged audio stream.
//!
//! `open_stream` resolves the track, validates the `Range` header against the
//! blob size and opens a reader positioned at the first requested byte.
//! `TrackStream::into_response` hands that reader to a copy task that feeds
//! the response body; the task owns the reader and drops it on every exit,
//! including a client hanging up mid-transfer.

use axum::body::Body;
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;
use tune_axum::TuneAxumError;
use tune_blob::{
    copy_exactly, parse_range, unsatisfied_content_range, BlobError, ChannelSink, CopyOutcome,
    OpenedBlob, RangeError, RangeSpec,
};
use tune_core::errors::TuneError;

use crate::app::Library;
use crate::models::{Track, DEFAULT_AUDIO_TYPE};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("track not found")]
    TrackNotFound,

    #[error(transparent)]
    Store(StoreError),

    #[error("{source}")]
    Range {
        #[source]
        source: RangeError,
        total_size: u64,
    },

    #[error("audio not found for track {track_id}")]
    BlobMissing { track_id: String },

    #[error("opening audio failed: {0}")]
    Blob(#[source] BlobError),
}

impl StreamError {
    fn from_store(err: StoreError) -> Self {
        if err.is_not_found() {
            Self::TrackNotFound
        } else {
            Self::Store(err)
        }
    }

    fn from_open(track_id: &str, err: BlobError) -> Self {
        if err.is_not_found() {
            Self::BlobMissing {
                track_id: track_id.to_string(),
            }
        } else {
            Self::Blob(err)
        }
    }
}

impl From<StreamError> for TuneError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::TrackNotFound => TuneError::not_found("track not found"),
            StreamError::Store(err) => err.into(),
            StreamError::Range { source, .. } => TuneError::range_not_satisfiable(source.to_string()),
            StreamError::BlobMissing { .. } => TuneError::not_found("audio not found"),
            StreamError::Blob(err) => {
                TuneError::general_error("opening audio failed").with_source(err.into())
            }
        }
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        let unsatisfied = match &self {
            StreamError::Range { total_size, .. } => {
                HeaderValue::from_str(&unsatisfied_content_range(*total_size)).ok()
            }
            _ => None,
        };

        let mut response = TuneAxumError::from(TuneError::from(self)).into_response();
        if let Some(value) = unsatisfied {
            response.headers_mut().insert(CONTENT_RANGE, value);
        }
        response
    }
}

/// A track opened for streaming, not yet turned into a response.
#[derive(Debug)]
pub struct TrackStream {
    pub track: Track,
    pub range: RangeSpec,
    pub total_size: u64,
    pub blob: OpenedBlob,
}

#[tracing::instrument(skip(library, range_header), fields(range = range_header.unwrap_or("-")))]
pub async fn open_stream(
    library: &Library,
    track_id: &str,
    range_header: Option<&str>,
) -> Result<TrackStream, StreamError> {
    let track = library
        .tracks
        .find_track(track_id)
        .await
        .map_err(StreamError::from_store)?;

    let total_size = match track.size_bytes {
        Some(size) => size,
        None => {
            library
                .blobs
                .head(&track.blob)
                .await
                .map_err(|err| StreamError::from_open(track_id, err))?
                .size_bytes
        }
    };

    let range = parse_range(range_header, total_size)
        .map_err(|source| StreamError::Range { source, total_size })?;

    let blob = library
        .blobs
        .open_at(&track.blob, range.start)
        .await
        .map_err(|err| StreamError::from_open(track_id, err))?;

    if blob.total_size != total_size {
        tracing::warn!(
            recorded = total_size,
            stored = blob.total_size,
            "track size differs from stored blob"
        );
    }

    tracing::debug!(start = range.start, end = range.end, total_size, "stream opened");
    Ok(TrackStream {
        track,
        range,
        total_size,
        blob,
    })
}

impl TrackStream {
    pub fn status(&self, full_status: StatusCode) -> StatusCode {
        if self.range.is_partial {
            StatusCode::PARTIAL_CONTENT
        } else {
            full_status
        }
    }

    pub fn headers(&self, status: StatusCode) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let content_type = self
            .track
            .content_type
            .as_deref()
            .or(self.blob.content_type.as_deref())
            .unwrap_or(DEFAULT_AUDIO_TYPE);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_AUDIO_TYPE)),
        );
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(CONTENT_DISPOSITION, inline_disposition(&self.track.title));
        if status == StatusCode::PARTIAL_CONTENT {
            if let Ok(value) = HeaderValue::from_str(&self.range.content_range(self.total_size)) {
                headers.insert(CONTENT_RANGE, value);
            }
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(self.range.content_length()));
        headers
    }

    /// Start the copy task and build the response around its output.
    pub fn into_response(self, chunk_size: usize, full_status: StatusCode) -> Response {
        let status = self.status(full_status);
        let headers = self.headers(status);
        let length = self.range.content_length();
        let mut reader = self.blob.reader;

        let (mut sink, rx) = ChannelSink::channel(1);
        let span = tracing::info_span!("copy", track_id = %self.track.id, length);

        tokio::spawn(
            async move {
                match copy_exactly(&mut sink, &mut reader, length, chunk_size).await {
                    Ok(CopyOutcome::Complete { copied }) => {
                        tracing::debug!(copied, "stream complete");
                    }
                    Ok(CopyOutcome::EndOfData { copied }) => {
                        tracing::warn!(copied, expected = length, "audio ended early");
                        sink.abort(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "audio ended before the announced length",
                        ))
                        .await;
                    }
                    Err(BlobError::Sink { .. }) => {
                        tracing::debug!("client went away");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "stream aborted");
                        sink.abort(std::io::Error::other(err.to_string())).await;
                    }
                }
                drop(reader);
            }
            .instrument(span),
        );

        let body = Body::from_stream(ReceiverStream::new(rx));
        (status, headers, body).into_response()
    }
}

fn inline_disposition(title: &str) -> HeaderValue {
    let cleaned: String = title
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    HeaderValue::from_str(&format!("inline; filename=\"{cleaned}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use std::time::Duration;

    use bytes::Bytes;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tune_blob::{BlobAdapter, BlobConfig, BlobPut, BlobReader, FsBlobStore, MemoryBlobStore};
    use tune_core::ErrorKind;

    use crate::settings::LibrarySettings;
    use crate::store::{MemoryPlaylistStore, MemoryTrackStore, TrackStore};

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 256) as u8).collect()
    }

    async fn library_with(data: Vec<u8>, record_size: bool) -> (Library, String) {
        let blobs = BlobAdapter::new(MemoryBlobStore::new().with_chunk_size(64), BlobConfig::new());
        let size = data.len() as u64;
        library_over(blobs, data, record_size.then_some(size)).await
    }

    /// A library whose only track `t1` records `recorded_size` for `data`.
    async fn library_over(
        blobs: BlobAdapter,
        data: Vec<u8>,
        recorded_size: Option<u64>,
    ) -> (Library, String) {
        let settings = LibrarySettings::from_config(&tune_core::TuneConfig::new()).unwrap();
        let body = futures_util::stream::once(async move { Ok::<_, std::io::Error>(Bytes::from(data)) });
        let receipt = blobs.put(BlobPut::new(), Box::pin(body)).await.unwrap();

        let tracks = MemoryTrackStore::new();
        let now = Utc::now();
        tracks
            .insert_track(Track {
                id: "t1".into(),
                title: "Blue \"Moon\"".into(),
                artist: "Band".into(),
                album: String::new(),
                genre: String::new(),
                release_year: 1999,
                duration: 200,
                blob: receipt.id,
                size_bytes: recorded_size,
                content_type: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let library = Library::new(
            settings,
            blobs,
            Arc::new(tracks),
            Arc::new(MemoryPlaylistStore::new()),
        );
        (library, "t1".to_string())
    }

    #[tokio::test]
    async fn unknown_track_is_not_found() {
        let (library, _) = library_with(sample(10), true).await;
        let err = open_stream(&library, "nope", None).await.unwrap_err();
        assert!(matches!(err, StreamError::TrackNotFound));
        assert_eq!(TuneError::from(err).kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn size_comes_from_blob_when_not_recorded() {
        let (library, id) = library_with(sample(1000), false).await;
        let stream = open_stream(&library, &id, Some("bytes=500-")).await.unwrap();
        assert_eq!(stream.total_size, 1000);
        assert_eq!((stream.range.start, stream.range.end), (500, 999));
        assert_eq!(stream.blob.reader.position(), 500);
    }

    #[tokio::test]
    async fn bad_range_maps_to_416() {
        let (library, id) = library_with(sample(50), true).await;
        let err = open_stream(&library, &id, Some("bytes=100-200")).await.unwrap_err();
        assert!(matches!(err, StreamError::Range { total_size: 50, .. }));

        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(res.headers()[CONTENT_RANGE], "bytes */50");
    }

    #[tokio::test]
    async fn headers_describe_the_range() {
        let (library, id) = library_with(sample(1000), true).await;
        let stream = open_stream(&library, &id, Some("bytes=500-999")).await.unwrap();
        let status = stream.status(StatusCode::PARTIAL_CONTENT);
        let headers = stream.headers(status);

        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(headers[CONTENT_TYPE], "audio/mpeg");
        assert_eq!(headers[ACCEPT_RANGES], "bytes");
        assert_eq!(headers[CONTENT_RANGE], "bytes 500-999/1000");
        assert_eq!(headers[CONTENT_LENGTH], "500");
        assert_eq!(headers[CONTENT_DISPOSITION], "inline; filename=\"Blue Moon\"");
    }

    #[tokio::test]
    async fn full_file_status_is_configurable() {
        let (library, id) = library_with(sample(100), true).await;
        let stream = open_stream(&library, &id, None).await.unwrap();

        assert_eq!(stream.status(StatusCode::PARTIAL_CONTENT), StatusCode::PARTIAL_CONTENT);
        let status = stream.status(StatusCode::OK);
        assert_eq!(status, StatusCode::OK);
        assert!(stream.headers(status).get(CONTENT_RANGE).is_none());
    }

    #[tokio::test]
    async fn failed_skip_is_a_server_error_on_every_backend() {
        let dir = tempfile::tempdir().unwrap();
        let backends = [
            BlobAdapter::new(MemoryBlobStore::new(), BlobConfig::new()),
            BlobAdapter::new(FsBlobStore::new(dir.path()), BlobConfig::new()),
        ];

        for blobs in backends {
            let native = blobs.supports_ranges();
            let (library, id) = library_over(blobs, sample(1000), Some(2000)).await;
            let err = open_stream(&library, &id, Some("bytes=1500-")).await.unwrap_err();
            assert!(matches!(err, StreamError::Blob(_)), "native ranges: {native}");

            let res = err.into_response();
            assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR, "native ranges: {native}");
            assert!(res.headers().get(CONTENT_RANGE).is_none());
        }
    }

    #[tokio::test]
    async fn short_blob_aborts_the_body() {
        let dir = tempfile::tempdir().unwrap();
        let backends = [
            BlobAdapter::new(MemoryBlobStore::new().with_chunk_size(64), BlobConfig::new()),
            BlobAdapter::new(FsBlobStore::new(dir.path()), BlobConfig::new()),
        ];

        for blobs in backends {
            let (library, id) = library_over(blobs, sample(1000), Some(2000)).await;
            let stream = open_stream(&library, &id, Some("bytes=500-")).await.unwrap();
            let res = stream.into_response(128, StatusCode::PARTIAL_CONTENT);

            assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
            assert_eq!(res.headers()[CONTENT_LENGTH], "1500");
            assert!(res.into_body().collect().await.is_err());
        }
    }

    #[tokio::test]
    async fn dropped_body_stops_the_copy_and_releases_the_reader() {
        let (library, id) = library_with(sample(10), true).await;
        let track = library.tracks.find_track(&id).await.unwrap();

        // endless source; its sender half is dropped together with the reader
        let (guard, released) = tokio::sync::oneshot::channel::<()>();
        let endless = futures_util::stream::repeat_with(move || {
            let _held = &guard;
            Ok::<_, std::io::Error>(Bytes::from_static(&[7u8; 64]))
        });
        let total_size = u64::MAX / 2;
        let stream = TrackStream {
            track,
            range: parse_range(None, total_size).unwrap(),
            total_size,
            blob: OpenedBlob {
                reader: BlobReader::new(Box::pin(endless)),
                total_size,
                content_type: None,
                etag: None,
            },
        };

        let mut body = stream.into_response(64, StatusCode::PARTIAL_CONTENT).into_body();
        let first = body.frame().await.unwrap().unwrap();
        assert_eq!(first.into_data().unwrap().len(), 64);
        drop(body);

        let outcome = tokio::time::timeout(Duration::from_secs(5), released)
            .await
            .expect("copy task kept the reader alive");
        assert!(outcome.is_err());
    }

    #[test]
    fn disposition_strips_quotes_and_controls() {
        assert_eq!(
            inline_disposition("a\"b\nc"),
            HeaderValue::from_static("inline; filename=\"abc\"")
        );
    }
}
