//! # tune-blob: blob storage for streamed audio
//!
//! `tune-blob` stores audio files as opaque blobs and serves them back as
//! forward-only streams that can start at any byte offset.
//!
//! - **Stores**: [`BlobStore`] backends for memory and the local filesystem.
//!   A store that can seek advertises it through [`StoreCapabilities`];
//!   others are positioned by skipping.
//! - **Ranges**: [`parse_range`] turns a `Range` header into an inclusive
//!   [`RangeSpec`] validated against the blob size.
//! - **Copy**: [`copy_exactly`] moves an exact number of bytes from a
//!   [`BlobReader`] into any [`ChunkSink`], flushing after every chunk.
//!
//! ```rust
//! use tune_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let adapter = BlobAdapter::new(MemoryBlobStore::new(), BlobConfig::default());
//!
//! let body = futures_util::stream::once(async { Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"0123456789")) });
//! let receipt = adapter.put(BlobPut::new(), Box::pin(body)).await?;
//!
//! let range = parse_range(Some("bytes=4-7"), receipt.size_bytes).expect("valid range");
//! let mut opened = adapter.open_at(&receipt.id, range.start).await?;
//!
//! let mut out: Vec<u8> = Vec::new();
//! copy_exactly(&mut out, &mut opened.reader, range.content_length(), 4).await?;
//! assert_eq!(out, b"4567");
//! # Ok(())
//! # }
//! ```

pub mod adapter;
mod config;
pub mod copy;
mod error;
mod fs;
mod memory;
pub mod range;
mod reader;
mod receipt;
pub mod store;
mod types;

// Re-export main types for clean API
pub use adapter::BlobAdapter;
pub use config::{BlobConfig, DEFAULT_CHUNK_SIZE};
pub use copy::{copy_exactly, BodyChunk, ChannelSink, ChunkSink, CopyOutcome};
pub use error::{BlobError, BlobResult};
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use range::{parse_range, unsatisfied_content_range, RangeError, RangeSpec};
pub use reader::{BlobReader, ReadOutcome};
pub use receipt::{BlobReceipt, OpenedBlob};
pub use store::{
    BlobKeyStrategy, BlobStore, DefaultKeyStrategy, GetResult, ObjectHead, PutResult,
    ResolvedRange, StoreCapabilities,
};
pub use types::{BlobId, BlobPut, ByteRange, ByteStream};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        copy_exactly, parse_range, BlobAdapter, BlobConfig, BlobError, BlobId, BlobPut,
        BlobReceipt, BlobResult, BlobStore, ByteStream, ChunkSink, MemoryBlobStore, RangeSpec,
    };
}
