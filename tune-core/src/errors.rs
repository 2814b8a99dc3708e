//! # Errors
//!
//! Every failure that can reach a client carries an [`ErrorKind`]. The kind,
//! never the message text, decides the HTTP status a transport renders.
//!
//! - consistent status codes and names
//! - can be carried through `anyhow::Error`
//! - transport-agnostic (the server crate decides how to serialize)
//!
//! With feature `serde` you also get `data` as a `serde_json::Value` and the
//! `to_json()` helper producing `{"error": "<message>"}`.

use std::fmt;

use anyhow::Error as AnyError;

/// A convenience result type for tune APIs that flow through `anyhow`.
pub type TuneResult<T> = std::result::Result<T, AnyError>;

/// Error classes understood by every transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,          // 400
    NotFound,            // 404
    PayloadTooLarge,     // 413
    RangeNotSatisfiable, // 416
    GeneralError,        // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::RangeNotSatisfiable => 416,
            ErrorKind::GeneralError => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::RangeNotSatisfiable => "RangeNotSatisfiable",
            ErrorKind::GeneralError => "GeneralError",
        }
    }

    /// Server-side failures get their message replaced before reaching a client.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(feature = "serde")]
pub type ErrorValue = serde_json::Value;

#[cfg(not(feature = "serde"))]
pub type ErrorValue = std::sync::Arc<dyn std::any::Any + Send + Sync>;

/// A structured error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct TuneError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<ErrorValue>,
    pub source: Option<AnyError>,
}

impl TuneError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: ErrorValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Convert into `anyhow::Error` so it can be returned with `?`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to a `TuneError` if possible.
    pub fn from_anyhow(err: &AnyError) -> Option<&TuneError> {
        err.downcast_ref::<TuneError>()
    }

    /// Turn any error into a TuneError:
    /// - if it's already a TuneError, keep it
    /// - otherwise wrap as GeneralError
    pub fn normalize(err: AnyError) -> TuneError {
        match err.downcast::<TuneError>() {
            Ok(tune) => tune,
            Err(other) => TuneError::new(ErrorKind::GeneralError, other.to_string()).with_source(other),
        }
    }

    /// A copy suitable for returning to clients. The `source` chain is dropped,
    /// and 5xx messages are replaced so storage details never leak.
    pub fn sanitize_for_client(&self) -> TuneError {
        let message = if self.kind.is_server_error() {
            "internal server error".to_string()
        } else {
            self.message.clone()
        };
        TuneError {
            kind: self.kind,
            message,
            data: self.data.clone(),
            source: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, msg)
    }
    pub fn range_not_satisfiable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeNotSatisfiable, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
}

impl fmt::Display for TuneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for TuneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(feature = "serde")]
impl TuneError {
    /// Client payload: `{"error": "<message>"}`, plus `data` when present.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut base = json!({ "error": self.message });
        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        base
    }
}

/// Bail out of an `anyhow`-returning function with a TuneError.
#[macro_export]
macro_rules! bail_tune {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::TuneError::$ctor($msg).into_anyhow());
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::TuneError::$ctor(format!($fmt, $($arg)*)).into_anyhow());
    };
}
