//! Listing output: JSON or HTML through a pluggable template.

use std::fmt;
use std::sync::Arc;

use askama::Template;
use bytes::Bytes;
use http::HeaderMap;
use http::header::CONTENT_TYPE;

use super::ListingPage;
use super::pool::BufferPool;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Failure while serializing a listing.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    /// JSON encoding failed.
    #[error("failed to encode listing as JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The built-in template failed.
    #[error("failed to render listing template: {0}")]
    Template(#[from] askama::Error),
    /// A template loaded from a file failed.
    #[error("failed to render listing template file: {0}")]
    FileTemplate(#[from] minijinja::Error),
    /// A custom template failed.
    #[error("failed to render listing: {0}")]
    Render(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Output format of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingFormat {
    /// `{next_token, count, items, more}` JSON.
    Json,
    /// HTML from the configured template.
    Html,
}

impl ListingFormat {
    /// JSON when the request's `Content-Type` is `application/json`, HTML otherwise.
    #[must_use]
    pub fn negotiate(headers: &HeaderMap) -> Self {
        let is_json = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<mime::Mime>().ok())
            .is_some_and(|m| m.essence_str() == mime::APPLICATION_JSON.essence_str());
        if is_json { Self::Json } else { Self::Html }
    }
}

/// Renders a listing page as HTML.
pub trait ListingTemplate: Send + Sync + fmt::Debug {
    /// Append the rendered page to `out`.
    fn render(&self, page: &ListingPage, out: &mut Vec<u8>) -> Result<(), ListingError>;
}

#[derive(Template)]
#[template(path = "listing.html")]
struct ListingHtml<'a> {
    page: &'a ListingPage,
}

/// The built-in HTML listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultListingTemplate;

impl ListingTemplate for DefaultListingTemplate {
    fn render(&self, page: &ListingPage, out: &mut Vec<u8>) -> Result<(), ListingError> {
        let html = ListingHtml { page }.render()?;
        out.extend_from_slice(html.as_bytes());
        Ok(())
    }
}

/// A rendered listing body and its content type.
#[derive(Debug, Clone)]
pub struct RenderedListing {
    /// `Content-Type` header value.
    pub content_type: &'static str,
    /// Response body.
    pub body: Bytes,
}

/// Serializes listing pages through pooled buffers.
#[derive(Debug, Clone)]
pub struct ListingRenderer {
    template: Arc<dyn ListingTemplate>,
    pool: Arc<BufferPool>,
}

impl Default for ListingRenderer {
    fn default() -> Self {
        Self::new(Arc::new(DefaultListingTemplate))
    }
}

impl ListingRenderer {
    /// Create a renderer using `template` for HTML.
    #[must_use]
    pub fn new(template: Arc<dyn ListingTemplate>) -> Self {
        Self {
            template,
            pool: Arc::new(BufferPool::default()),
        }
    }

    /// Render `page` in the requested format.
    pub fn render(
        &self,
        page: &ListingPage,
        format: ListingFormat,
    ) -> Result<RenderedListing, ListingError> {
        let mut buf = self.pool.acquire();
        let content_type = match format {
            ListingFormat::Json => {
                serde_json::to_writer(&mut *buf, page)?;
                buf.push(b'\n');
                JSON_CONTENT_TYPE
            }
            ListingFormat::Html => {
                self.template.render(page, &mut buf)?;
                HTML_CONTENT_TYPE
            }
        };
        Ok(RenderedListing {
            content_type,
            body: buf.to_bytes(),
        })
    }
}
