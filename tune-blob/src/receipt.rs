use serde::{Deserialize, Serialize};

use crate::{BlobId, BlobReader};

/// Receipt returned after successfully storing a blob
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobReceipt {
    pub id: BlobId,
    pub key: String,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub filename: Option<String>,
    pub etag: Option<String>,
    pub created_at: i64,
    pub accepts_ranges: bool,
}

impl BlobReceipt {
    /// Create a new blob receipt
    pub fn new(id: BlobId, key: String, size_bytes: u64) -> Self {
        Self {
            id,
            key,
            size_bytes,
            content_type: None,
            filename: None,
            etag: None,
            created_at: chrono::Utc::now().timestamp(),
            accepts_ranges: false,
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_etag<S: Into<String>>(mut self, etag: S) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Enable range support
    pub fn with_range_support(mut self) -> Self {
        self.accepts_ranges = true;
        self
    }
}

/// A blob opened for reading, positioned at some offset.
#[derive(Debug)]
pub struct OpenedBlob {
    pub reader: BlobReader,
    /// Size of the whole blob.
    pub total_size: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

impl OpenedBlob {
    /// Bytes left between the reader position and the end of the blob.
    pub fn remaining(&self) -> u64 {
        self.total_size.saturating_sub(self.reader.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::test_support::chunked;

    #[test]
    fn remaining_tracks_reader_position() {
        let mut opened = OpenedBlob {
            reader: BlobReader::new(chunked(b"0123456789", 3)),
            total_size: 10,
            content_type: None,
            etag: None,
        };
        assert_eq!(opened.remaining(), 10);

        tokio_test::block_on(opened.reader.skip(4)).unwrap();
        assert_eq!(opened.remaining(), 6);
    }

    #[test]
    fn receipt_serializes_blob_id_as_string() {
        let receipt = BlobReceipt::new(BlobId::from_string("b1".into()), "audio/b1".into(), 3)
            .with_content_type("audio/ogg")
            .with_range_support();
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["id"], "b1");
        assert_eq!(json["accepts_ranges"], true);
    }
}
