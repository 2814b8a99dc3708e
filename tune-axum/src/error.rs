use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tune_core::errors::TuneError;

#[derive(Debug)]
pub struct TuneAxumError(pub anyhow::Error);

impl From<anyhow::Error> for TuneAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<TuneError> for TuneAxumError {
    fn from(e: TuneError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for TuneAxumError {
    fn into_response(self) -> Response {
        // A TuneError anywhere in the chain decides the status
        if let Some(tune) = self.0.chain().find_map(|e| e.downcast_ref::<TuneError>()) {
            if tune.kind.is_server_error() {
                tracing::error!(error = ?self.0, "request failed");
            }
            let safe = tune.sanitize_for_client();
            let status = StatusCode::from_u16(safe.code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, Json(safe.to_json())).into_response();
        }

        tracing::error!(error = ?self.0, "unclassified request failure");
        let tune = TuneError::general_error(self.0.to_string());
        let safe = tune.sanitize_for_client();
        let status = StatusCode::from_u16(safe.code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
