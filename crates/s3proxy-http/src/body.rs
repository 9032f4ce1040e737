//! Response body supporting buffered, streaming and empty modes.
//!
//! - **Buffered**: rendered listings and other small bodies.
//! - **Streaming**: object content copied chunk by chunk from the store.
//! - **Empty**: status-only responses.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use http_body::{Frame, SizeHint};
use http_body_util::Full;
use s3proxy_core::ResponseBody;
use s3proxy_model::{ByteStream, StreamingBlob};
use tracing::warn;

/// HTTP response body for proxy responses.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper.
#[derive(Default)]
pub enum ProxyResponseBody {
    /// A fully rendered body.
    Buffered(Full<Bytes>),
    /// A chunk stream from the store with its reported length.
    Streaming {
        /// Remaining chunks.
        stream: ByteStream,
        /// Length reported by the store.
        content_length: Option<u64>,
    },
    /// No body.
    #[default]
    Empty,
}

impl std::fmt::Debug for ProxyResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(full) => f.debug_tuple("Buffered").field(full).finish(),
            Self::Streaming { content_length, .. } => f
                .debug_struct("Streaming")
                .field("content_length", content_length)
                .finish_non_exhaustive(),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

impl ProxyResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create a streaming body from a store blob.
    #[must_use]
    pub fn from_blob(blob: StreamingBlob) -> Self {
        let content_length = blob.content_length();
        Self::Streaming {
            stream: blob.into_stream(),
            content_length,
        }
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }
}

impl From<ResponseBody> for ProxyResponseBody {
    fn from(body: ResponseBody) -> Self {
        match body {
            ResponseBody::Empty => Self::Empty,
            ResponseBody::Buffered(bytes) => Self::from_bytes(bytes),
            ResponseBody::Streaming(blob) => Self::from_blob(blob),
        }
    }
}

impl http_body::Body for ProxyResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming { stream, .. } => match stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(Frame::data(chunk)))),
                Poll::Ready(Some(Err(err))) => {
                    // Headers are already on the wire; all we can do is log and abort.
                    warn!(error = %err, "object stream failed mid-response");
                    Poll::Ready(Some(Err(err)))
                }
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming { content_length, .. } => *content_length == Some(0),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming {
                content_length: Some(len),
                ..
            } => SizeHint::with_exact(*len),
            Self::Streaming { .. } => SizeHint::default(),
            Self::Empty => SizeHint::with_exact(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use http_body::Body;
    use http_body_util::BodyExt;

    use super::*;

    #[test]
    fn test_should_report_empty_body_as_end_of_stream() {
        let body = ProxyResponseBody::empty();
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }

    #[test]
    fn test_should_create_buffered_body_from_bytes() {
        let body = ProxyResponseBody::from_bytes(Bytes::from("hello"));
        assert!(!body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(5));
    }

    #[test]
    fn test_should_use_store_length_as_size_hint() {
        let body = ProxyResponseBody::from_blob(StreamingBlob::from_bytes("hello world"));
        assert_eq!(body.size_hint().exact(), Some(11));

        let unknown = StreamingBlob::from_stream(futures::stream::empty(), None);
        let body = ProxyResponseBody::from_blob(unknown);
        assert_eq!(body.size_hint().exact(), None);
    }

    #[tokio::test]
    async fn test_should_stream_all_chunks() {
        let chunks = vec![Ok(Bytes::from("hel")), Ok(Bytes::from("lo"))];
        let blob = StreamingBlob::from_stream(futures::stream::iter(chunks), Some(5));
        let collected = ProxyResponseBody::from_blob(blob)
            .collect()
            .await
            .expect("collect")
            .to_bytes();
        assert_eq!(&collected[..], b"hello");
    }

    #[tokio::test]
    async fn test_should_surface_stream_errors() {
        let chunks = vec![
            Ok(Bytes::from("partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let blob = StreamingBlob::from_stream(futures::stream::iter(chunks), Some(100));
        let result = ProxyResponseBody::from_blob(blob).collect().await;
        assert!(result.is_err());
    }

    #[test]
    fn test_should_convert_proxy_bodies() {
        let body = ProxyResponseBody::from(ResponseBody::Buffered(Bytes::from("abc")));
        assert_eq!(body.size_hint().exact(), Some(3));
        let body = ProxyResponseBody::from(ResponseBody::Empty);
        assert!(body.is_end_stream());
    }
}
