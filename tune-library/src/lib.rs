mod app;
mod errors;
pub mod models;
pub mod services;
pub mod settings;
pub mod store;
pub mod streaming;

use tune_axum::{axum, AxumApp};
use tune_core::TuneConfig;

pub use app::Library;
pub use settings::{LibrarySettings, ENV_PREFIX};

/// Build the HTTP app: API routes under `api.prefix`, `/health` at the root.
pub async fn build(config: TuneConfig) -> anyhow::Result<AxumApp<Library>> {
    let library = Library::from_config(&config).await?;
    let prefix = library.settings.api_prefix.clone();

    let ax = axum(library);
    let api = services::router(ax.state());

    let mut ax = ax
        .use_router(&prefix, api)
        .service("/health", || async { "ok" })
        .with_request_tracing();

    ax.router = ax.router.layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
            .expose_headers([
                axum::http::header::CONTENT_RANGE,
                axum::http::header::ACCEPT_RANGES,
                axum::http::header::CONTENT_LENGTH,
            ]),
    );

    Ok(ax)
}
