//! Outbound request descriptors.

use bytes::Bytes;
use http::{HeaderMap, Method};
use url::{Position, Url};

use crate::Error;

/// An immutable description of a request headed for the origin.
///
/// The fragment is always stripped from the URL so that two descriptors for
/// the same resource compare (and hash) equal.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestDescriptor {
    /// Create a descriptor with no headers and an empty body.
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method, url, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// Parse an absolute URL into a GET descriptor.
    pub fn get(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::new(Method::GET, url))
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Ordered segments of everything after the authority.
    ///
    /// Only scheme and host are removed: the query string stays attached to
    /// the last segment, so `/api/config?v=2` yields `["api", "config?v=2"]`.
    /// One leading `/` is dropped before splitting, so the site root yields
    /// a single empty segment.
    pub fn path_segments(&self) -> Vec<&str> {
        split_path(&self.url[Position::BeforePath..Position::AfterQuery])
    }
}

/// Split a URL path into segments the way request classification expects.
///
/// Never returns an empty list: a path with no content yields `[""]`.
pub fn split_path(path: &str) -> Vec<&str> {
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}
