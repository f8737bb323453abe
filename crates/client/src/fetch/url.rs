//! Origin URL parsing and request URL resolution.

use url::Url;

/// Error type for origin and request URL failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize the configured origin.
///
/// The input must carry an explicit `http` or `https` scheme, as configuration
/// validation requires. Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Lowercase the host
/// 3. Drop any path, query or fragment: the origin is a scheme + authority
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut origin = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if !matches!(origin.scheme(), "http" | "https") {
        return Err(UrlError::UnsupportedScheme(origin.scheme().to_string()));
    }

    let host = origin
        .host_str()
        .map(str::to_lowercase)
        .ok_or_else(|| UrlError::InvalidUrl(format!("missing host: {trimmed}")))?;
    origin
        .set_host(Some(&host))
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);

    Ok(origin)
}

/// Resolve a path (with optional query) against the origin.
///
/// Only the path and query are replaced, so a path such as `//other.host/x`
/// can never redirect the request away from the origin. The fragment never
/// reaches the origin and is stripped.
pub fn resolve(origin: &Url, path_and_query: &str) -> Result<Url, UrlError> {
    if !path_and_query.starts_with('/') {
        return Err(UrlError::InvalidUrl(format!("path must start with '/': {path_and_query}")));
    }
    let without_fragment = path_and_query.split('#').next().unwrap_or_default();
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    };

    let mut resolved = origin.clone();
    resolved.set_path(path);
    resolved.set_query(query);
    resolved.set_fragment(None);
    Ok(resolved)
}
