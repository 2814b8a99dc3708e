use std::sync::Arc;

use axum::extract::Request;
use axum::handler::Handler;
use axum::http::HeaderName;
use axum::routing::get;
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::TuneAxumState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct AxumApp<S>
where
    S: Send + Sync + 'static,
{
    pub app: Arc<S>,
    pub router: Router<()>,
}

impl<S> Clone for AxumApp<S>
where
    S: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            router: self.router.clone(),
        }
    }
}

impl<S> AxumApp<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(app: S) -> Self {
        Self {
            app: Arc::new(app),
            router: Router::new(),
        }
    }

    /// State handed to routers built for this app.
    pub fn state(&self) -> TuneAxumState<S> {
        TuneAxumState::from_arc(Arc::clone(&self.app))
    }

    /// Mount `router` under `path`. An empty path or `/` merges at the root.
    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        let path = path.trim_end_matches('/');
        self.router = if path.is_empty() {
            self.router.merge(router)
        } else {
            self.router.nest(path, router)
        };
        self
    }

    pub fn use_get<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + 'static,
        T: 'static,
    {
        let router = Router::new().route(path, get(handler));
        self.use_router("", router)
    }

    pub fn service<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + 'static,
        T: 'static,
    {
        self.use_get(path, handler)
    }

    /// Wrap every route mounted so far in a request span and `x-request-id`
    /// handling. Call after the last route is added.
    pub fn with_request_tracing(mut self) -> Self {
        let header = HeaderName::from_static(REQUEST_ID_HEADER);

        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(header.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
                let request_id = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::new(header));

        self.router = self.router.layer(layers);
        self
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

pub fn axum<S>(app: S) -> AxumApp<S>
where
    S: Send + Sync + 'static,
{
    AxumApp::new(app)
}
