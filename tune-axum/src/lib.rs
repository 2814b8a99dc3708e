//! tune-axum: Axum adapter for the tune music server.
//!
//! Builds Axum routers around shared application state, assigns and echoes
//! `x-request-id`, and renders `TuneError`s as JSON responses.

pub mod app;
pub mod state;
mod error;
pub use error::TuneAxumError;
pub use state::TuneAxumState;

pub use app::{axum, AxumApp, REQUEST_ID_HEADER};
