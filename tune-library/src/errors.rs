use tune_blob::BlobError;
use tune_core::errors::TuneError;

use crate::store::StoreError;

impl From<StoreError> for TuneError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, .. } => TuneError::not_found(format!("{entity} not found")),
            StoreError::Conflict { entity, id } => {
                TuneError::bad_request(format!("{entity} {id} already exists"))
            }
            StoreError::Backend(source) => {
                TuneError::general_error("metadata store failure").with_source(source)
            }
        }
    }
}

/// Classify a blob failure for a client.
pub fn from_blob(err: BlobError) -> TuneError {
    let tune = match &err {
        BlobError::NotFound { .. } => TuneError::not_found("audio not found"),
        BlobError::TooLarge { limit } => {
            TuneError::payload_too_large(format!("audio exceeds {limit} bytes"))
        }
        BlobError::Invalid { message } => TuneError::bad_request(message.clone()),
        _ => TuneError::general_error("blob storage failure"),
    };
    tune.with_source(err.into())
}
