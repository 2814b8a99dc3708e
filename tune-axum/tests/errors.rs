use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use tune_axum::{axum, TuneAxumError, TuneAxumState};
use tune_core::errors::TuneError;

struct Catalog {
    known: &'static str,
}

async fn lookup(
    State(state): State<TuneAxumState<Catalog>>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> Result<String, TuneAxumError> {
    if id == state.known {
        return Ok(id);
    }
    Err(TuneError::not_found("track not found").into())
}

async fn boom() -> Result<String, TuneAxumError> {
    Err(anyhow::anyhow!("disk exploded at /var/lib/blobs").into())
}

async fn storage_failure() -> Result<String, TuneAxumError> {
    Err(TuneError::general_error("connection refused to 10.0.0.7")
        .into_anyhow()
        .context("opening blob")
        .into())
}

fn app() -> tune_axum::AxumApp<Catalog> {
    let ax = axum(Catalog { known: "t1" });
    let router = Router::new()
        .route("/tracks/{id}", get(lookup))
        .route("/boom", get(boom))
        .route("/storage", get(storage_failure))
        .with_state(ax.state());

    ax.use_router("/api", router)
        .service("/health", || async { "ok" })
        .with_request_tracing()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_ok() {
    let res = app().router.oneshot(get_req("/health")).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), "ok");
}

#[tokio::test]
async fn tune_error_keeps_status_and_message() {
    let res = app().router.oneshot(get_req("/api/tracks/nope")).await.unwrap();

    assert_eq!(res.status().as_u16(), 404);
    assert!(res.headers().get("x-request-id").is_some());
    assert_eq!(json_body(res).await, json!({"error": "track not found"}));
}

#[tokio::test]
async fn state_reaches_handlers() {
    let res = app().router.oneshot(get_req("/api/tracks/t1")).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let provided = HeaderValue::from_static("req-test-123");
    let res = app()
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/tracks/t1")
                .header("x-request-id", provided.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}

#[tokio::test]
async fn unclassified_errors_are_sanitized_500s() {
    let res = app().router.oneshot(get_req("/api/boom")).await.unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body, json!({"error": "internal server error"}));
}

#[tokio::test]
async fn wrapped_server_errors_hide_details() {
    let res = app().router.oneshot(get_req("/api/storage")).await.unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert!(!body.to_string().contains("10.0.0.7"));
}
