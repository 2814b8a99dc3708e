//! Bounded copy from a [`BlobReader`] into a response sink.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::{BlobError, BlobReader, BlobResult, ReadOutcome};

/// Destination of a streamed copy.
#[async_trait]
pub trait ChunkSink: Send {
    /// Write one chunk in full.
    async fn write_chunk(&mut self, chunk: Bytes) -> std::io::Result<()>;

    /// Push everything written so far towards the consumer.
    async fn flush(&mut self) -> std::io::Result<()>;
}

#[async_trait]
impl<W> ChunkSink for W
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_chunk(&mut self, chunk: Bytes) -> std::io::Result<()> {
        self.write_all(&chunk).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        AsyncWriteExt::flush(self).await
    }
}

/// Item type of a [`ChannelSink`] receiver, ready for `Body::from_stream`.
pub type BodyChunk = Result<Bytes, std::io::Error>;

/// Sink feeding a bounded channel that backs an HTTP response body.
///
/// With capacity 1 a write waits until the body has taken the previous
/// chunk, so a slow client slows reads from the store. When the body is
/// dropped every further write fails with `BrokenPipe`.
pub struct ChannelSink {
    tx: mpsc::Sender<BodyChunk>,
}

impl ChannelSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<BodyChunk>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Deliver `err` to the body so the connection is aborted instead of
    /// ending as if the transfer were complete.
    pub async fn abort(self, err: std::io::Error) {
        let _ = self.tx.send(Err(err)).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl ChunkSink for ChannelSink {
    async fn write_chunk(&mut self, chunk: Bytes) -> std::io::Result<()> {
        self.tx.send(Ok(chunk)).await.map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "response body dropped")
        })
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        // a sent chunk is already in the body's hands
        if self.tx.is_closed() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "response body dropped",
            ));
        }
        Ok(())
    }
}

/// How a copy finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Exactly the requested number of bytes was written.
    Complete { copied: u64 },
    /// The blob ended cleanly before the requested number of bytes.
    EndOfData { copied: u64 },
}

impl CopyOutcome {
    pub fn copied(&self) -> u64 {
        match self {
            CopyOutcome::Complete { copied } | CopyOutcome::EndOfData { copied } => *copied,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, CopyOutcome::Complete { .. })
    }
}

/// Copy exactly `n` bytes from `src` to `dst` in chunks of at most `chunk_size`,
/// flushing after every chunk.
///
/// Never writes more than `n` bytes. A read failure is [`BlobError::Io`]; a
/// write or flush failure is [`BlobError::Sink`].
pub async fn copy_exactly<S>(
    dst: &mut S,
    src: &mut BlobReader,
    n: u64,
    chunk_size: usize,
) -> BlobResult<CopyOutcome>
where
    S: ChunkSink + ?Sized,
{
    if chunk_size == 0 {
        return Err(BlobError::invalid("chunk size must be positive"));
    }

    let mut copied: u64 = 0;
    while copied < n {
        let remaining = n - copied;
        let want = remaining.min(chunk_size as u64) as usize;

        let mut chunk = match src.read_chunk(want).await? {
            ReadOutcome::Data(chunk) => chunk,
            ReadOutcome::EndOfData => {
                tracing::debug!(copied, expected = n, "blob ended before copy budget");
                return Ok(CopyOutcome::EndOfData { copied });
            }
        };

        if chunk.len() as u64 > remaining {
            chunk.truncate(remaining as usize);
        }
        let len = chunk.len() as u64;

        dst.write_chunk(chunk).await.map_err(BlobError::sink)?;
        dst.flush().await.map_err(BlobError::sink)?;
        copied += len;
    }

    Ok(CopyOutcome::Complete { copied })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::test_support::{chunked, failing_after};

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    /// Records every write so chunk boundaries can be asserted.
    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<Bytes>,
        flushes: usize,
    }

    #[async_trait]
    impl ChunkSink for RecordingSink {
        async fn write_chunk(&mut self, chunk: Bytes) -> std::io::Result<()> {
            self.writes.push(chunk);
            Ok(())
        }

        async fn flush(&mut self) -> std::io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn copies_exact_subrange_for_many_intervals() {
        let data = sample(300);
        for (start, end) in [(0u64, 299u64), (0, 0), (299, 299), (17, 211), (100, 163)] {
            let mut reader = BlobReader::new(chunked(&data, 13));
            reader.skip(start).await.unwrap();

            let mut out: Vec<u8> = Vec::new();
            let outcome = copy_exactly(&mut out, &mut reader, end - start + 1, 32).await.unwrap();

            assert!(outcome.is_complete());
            assert_eq!(out.len() as u64, end - start + 1);
            assert_eq!(&out[..], &data[start as usize..=end as usize]);
        }
    }

    #[tokio::test]
    async fn never_writes_past_budget_even_with_large_source_chunks() {
        let data = sample(1000);
        let mut reader = BlobReader::new(chunked(&data, 1000));
        let mut sink = RecordingSink::default();

        let outcome = copy_exactly(&mut sink, &mut reader, 100, 64).await.unwrap();

        assert_eq!(outcome, CopyOutcome::Complete { copied: 100 });
        let sizes: Vec<usize> = sink.writes.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![64, 36]);
        assert_eq!(sink.flushes, 2);
    }

    #[tokio::test]
    async fn short_blob_ends_with_end_of_data() {
        let data = sample(50);
        let mut reader = BlobReader::new(chunked(&data, 8));
        let mut out: Vec<u8> = Vec::new();

        let outcome = copy_exactly(&mut out, &mut reader, 80, 16).await.unwrap();

        assert_eq!(outcome, CopyOutcome::EndOfData { copied: 50 });
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn read_failure_is_surfaced() {
        let mut reader = BlobReader::new(failing_after(b"0123456789"));
        let mut out: Vec<u8> = Vec::new();

        let err = copy_exactly(&mut out, &mut reader, 100, 4).await.unwrap_err();

        assert!(matches!(err, BlobError::Io { .. }));
        assert_eq!(out, b"0123456789");
    }

    #[tokio::test]
    async fn dropped_body_is_a_sink_error() {
        let data = sample(100);
        let mut reader = BlobReader::new(chunked(&data, 10));
        let (mut sink, rx) = ChannelSink::channel(1);
        drop(rx);

        let err = copy_exactly(&mut sink, &mut reader, 100, 10).await.unwrap_err();
        assert!(matches!(err, BlobError::Sink { .. }));
    }

    #[tokio::test]
    async fn channel_sink_delivers_chunks_in_order() {
        let data = sample(100);
        let (mut sink, mut rx) = ChannelSink::channel(1);

        let producer = tokio::spawn(async move {
            let mut reader = BlobReader::new(chunked(&data, 9));
            copy_exactly(&mut sink, &mut reader, 100, 25).await
        });

        let mut received = Vec::new();
        while let Some(chunk) = rx.recv().await {
            received.extend_from_slice(&chunk.unwrap());
        }

        let outcome = producer.await.unwrap().unwrap();
        assert_eq!(outcome.copied(), 100);
        assert_eq!(received, sample(100));
    }

    #[tokio::test]
    async fn zero_budget_writes_nothing() {
        let mut reader = BlobReader::new(chunked(b"abc", 1));
        let mut sink = RecordingSink::default();

        let outcome = copy_exactly(&mut sink, &mut reader, 0, 8).await.unwrap();
        assert_eq!(outcome, CopyOutcome::Complete { copied: 0 });
        assert!(sink.writes.is_empty());
    }
}
