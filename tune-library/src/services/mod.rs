use axum::routing::{get, post};
use axum::Router;
use tune_axum::TuneAxumState;

use crate::app::Library;

pub mod playlists;
pub mod tracks;

pub type LibraryState = TuneAxumState<Library>;

pub fn router(state: LibraryState) -> Router<()> {
    Router::new()
        .route("/tracks", post(tracks::create))
        .route(
            "/tracks/{id}",
            get(tracks::find).patch(tracks::update).delete(tracks::remove),
        )
        .route("/tracks/{id}/stream", get(tracks::stream))
        .route("/playlists", post(playlists::create))
        .route(
            "/playlists/{id}",
            get(playlists::find)
                .patch(playlists::update)
                .delete(playlists::remove),
        )
        .route("/playlists/{id}/stream", get(playlists::stream_m3u))
        .with_state(state)
}
