use bytes::Bytes;
use futures_util::StreamExt;

use crate::{BlobError, BlobResult, ByteStream};

/// Largest piece discarded per step while skipping.
const SKIP_CHUNK: usize = 64 * 1024;

/// Outcome of a single read from a [`BlobReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Between 1 and `max` bytes.
    Data(Bytes),
    /// The blob has no more bytes. Not an error.
    EndOfData,
}

/// Forward-only reader over a stored blob.
///
/// Chunks from the underlying stream arrive in whatever size the store
/// produces; the reader re-slices them so callers get at most the number
/// of bytes they ask for. Dropping the reader drops the store stream.
pub struct BlobReader {
    stream: ByteStream,
    pending: Bytes,
    position: u64,
    finished: bool,
}

impl BlobReader {
    /// Reader positioned at the first byte of the blob.
    pub fn new(stream: ByteStream) -> Self {
        Self::at(stream, 0)
    }

    /// Reader over a stream that already begins at `offset`
    /// (a store that served a native range request).
    pub fn at(stream: ByteStream, offset: u64) -> Self {
        Self {
            stream,
            pending: Bytes::new(),
            position: offset,
            finished: false,
        }
    }

    /// Absolute offset of the next byte this reader will return.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read up to `max` bytes.
    ///
    /// A store failure is returned as [`BlobError::Io`]; it is never folded
    /// into [`ReadOutcome::EndOfData`].
    pub async fn read_chunk(&mut self, max: usize) -> BlobResult<ReadOutcome> {
        if max == 0 {
            return Err(BlobError::invalid("read size must be positive"));
        }

        loop {
            if !self.pending.is_empty() {
                let take = max.min(self.pending.len());
                let chunk = self.pending.split_to(take);
                self.position += take as u64;
                return Ok(ReadOutcome::Data(chunk));
            }

            if self.finished {
                return Ok(ReadOutcome::EndOfData);
            }

            match self.stream.next().await {
                Some(Ok(bytes)) => self.pending = bytes,
                Some(Err(source)) => return Err(BlobError::Io { source }),
                None => self.finished = true,
            }
        }
    }

    /// Advance by exactly `n` bytes, discarding them.
    ///
    /// Fails with an `UnexpectedEof` I/O error when the blob ends first.
    pub async fn skip(&mut self, n: u64) -> BlobResult<()> {
        let mut remaining = n;
        while remaining > 0 {
            let want = remaining.min(SKIP_CHUNK as u64) as usize;
            match self.read_chunk(want).await? {
                ReadOutcome::Data(chunk) => remaining -= chunk.len() as u64,
                ReadOutcome::EndOfData => {
                    return Err(BlobError::Io {
                        source: std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            format!("blob ended {remaining} bytes before skip target {n}"),
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for BlobReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobReader")
            .field("position", &self.position)
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish()
    }
}
