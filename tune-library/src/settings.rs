use std::path::PathBuf;

use anyhow::{bail, Result};
use axum::http::StatusCode;
use tune_blob::DEFAULT_CHUNK_SIZE;
use tune_core::{TuneConfig, TuneConfigSnapshot};

/// Prefix of environment variables mapped onto config keys.
pub const ENV_PREFIX: &str = "TUNE__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    Memory,
    Fs,
}

/// Typed view of the configuration used while building the app.
#[derive(Debug, Clone)]
pub struct LibrarySettings {
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
    pub blob_backend: BlobBackend,
    pub blob_dir: PathBuf,
    /// Directory-like prefix for blob keys, e.g. `audio/<id>`.
    pub blob_key_prefix: String,
    pub max_blob_bytes: u64,
    pub chunk_size: usize,
    /// Status for a stream answered without a `Range` header.
    pub full_status: StatusCode,
}

pub fn apply_defaults(config: &mut TuneConfig) {
    config.set_default("http.host", "127.0.0.1");
    config.set_default("http.port", "8080");
    config.set_default("api.prefix", "/api");
    config.set_default("blob.backend", "memory");
    config.set_default("blob.dir", "./data/blobs");
    config.set_default("blob.key_prefix", "audio");
    config.set_default("blob.max_bytes", (200u64 * 1024 * 1024).to_string());
    config.set_default("stream.chunk_size", DEFAULT_CHUNK_SIZE.to_string());
    config.set_default("stream.full_status", "206");
}

impl LibrarySettings {
    pub fn from_config(config: &TuneConfig) -> Result<Self> {
        let mut config = config.clone();
        apply_defaults(&mut config);
        Self::from_snapshot(&config.snapshot())
    }

    fn from_snapshot(s: &TuneConfigSnapshot) -> Result<Self> {
        let blob_backend = match s.get("blob.backend").map(str::trim) {
            Some("memory") | None => BlobBackend::Memory,
            Some("fs") => BlobBackend::Fs,
            Some(other) => bail!("unknown blob.backend `{other}` (expected memory or fs)"),
        };

        let full_status = match s.get_u16("stream.full_status") {
            Some(206) | None => StatusCode::PARTIAL_CONTENT,
            Some(200) => StatusCode::OK,
            Some(other) => bail!("stream.full_status must be 200 or 206, got {other}"),
        };

        let chunk_size = s.get_usize("stream.chunk_size").unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            bail!("stream.chunk_size must be positive");
        }

        let port = match s.get("http.port") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid http.port `{raw}`"))?,
            None => 8080,
        };

        Ok(Self {
            host: s.get_string("http.host").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            api_prefix: normalize_prefix(s.get("api.prefix").unwrap_or("/api")),
            blob_backend,
            blob_dir: PathBuf::from(s.get("blob.dir").unwrap_or("./data/blobs")),
            blob_key_prefix: s
                .get("blob.key_prefix")
                .unwrap_or("audio")
                .trim()
                .trim_matches('/')
                .to_string(),
            max_blob_bytes: s.get_u64("blob.max_bytes").unwrap_or(200 * 1024 * 1024),
            chunk_size,
            full_status,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
