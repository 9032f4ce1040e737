//! Streaming object bodies.
//!
//! [`StreamingBlob`] wraps a boxed stream of byte chunks together with the
//! length reported by the store, so object content can flow from the store
//! to the client without being buffered in memory.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::{Stream, TryStreamExt};

/// A boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send + 'static>>;

/// An object body streamed from (or to) the store.
pub struct StreamingBlob {
    stream: ByteStream,
    content_length: Option<u64>,
}

impl StreamingBlob {
    /// Create a blob from an in-memory buffer.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let len = data.len() as u64;
        let stream: ByteStream = if data.is_empty() {
            Box::pin(futures::stream::empty())
        } else {
            Box::pin(futures::stream::iter(std::iter::once(Ok(data))))
        };
        Self {
            stream,
            content_length: Some(len),
        }
    }

    /// Create a blob from a chunk stream and the length the store reported for it.
    #[must_use]
    pub fn from_stream<S>(stream: S, content_length: Option<u64>) -> Self
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
            content_length,
        }
    }

    /// Create an empty blob.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// The length reported by the store, if any.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Consume the blob, returning the underlying chunk stream.
    #[must_use]
    pub fn into_stream(self) -> ByteStream {
        self.stream
    }

    /// Drain the stream into a single contiguous buffer.
    pub async fn collect(self) -> io::Result<Bytes> {
        let mut buf = BytesMut::with_capacity(
            self.content_length
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or_default(),
        );
        let mut stream = self.stream;
        while let Some(chunk) = stream.try_next().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}

impl Stream for StreamingBlob {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().stream.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for StreamingBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingBlob")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl Default for StreamingBlob {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for StreamingBlob {
    fn from(data: Bytes) -> Self {
        Self::from_bytes(data)
    }
}

impl From<Vec<u8>> for StreamingBlob {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

impl From<&'static str> for StreamingBlob {
    fn from(data: &'static str) -> Self {
        Self::from_bytes(Bytes::from_static(data.as_bytes()))
    }
}
