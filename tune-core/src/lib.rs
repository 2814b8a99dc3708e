//! tune-core: framework-agnostic pieces shared by the tune crates.
//!
//! - [`errors`]: typed error kinds that decide the HTTP status of a failure
//! - [`config`]: a flat string key/value configuration store

pub mod config;
pub mod errors;

pub use config::{TuneConfig, TuneConfigSnapshot};
pub use errors::{ErrorKind, TuneError, TuneResult};
