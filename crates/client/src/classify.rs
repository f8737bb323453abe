//! Request classification.
//!
//! Decides, from the URL with scheme and host removed, whether a request is
//! served cache-first or left alone. The query string is not split off, so it
//! stays part of the last segment (`/?lang=fr` has the single segment
//! `?lang=fr`). Rules are evaluated in order:
//!
//! 1. First segment is a static asset prefix, or the path starts with
//!    `api/config` → [`PathCategory::StaticResource`]
//! 2. First segment is `api` → [`PathCategory::ApiCall`]
//! 3. First segment is a document route (the empty segment is the site
//!    root) → [`PathCategory::DocumentIndex`]
//! 4. Anything else → [`PathCategory::Unmatched`]

use cachefront_core::RequestDescriptor;
use cachefront_core::request::split_path;

/// First path segments served as static resources.
pub const STATIC_PREFIXES: &[&str] = &["assets", "manifest.json", "favicon.ico"];

/// First path segments that load the application document.
pub const INDEX_ROUTES: &[&str] = &["", "files", "view", "login", "logout"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCategory {
    StaticResource,
    ApiCall,
    DocumentIndex,
    Unmatched,
}

impl PathCategory {
    /// Whether requests in this category go through the cache.
    pub fn is_cacheable(self) -> bool {
        matches!(self, PathCategory::StaticResource | PathCategory::DocumentIndex)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PathCategory::StaticResource => "static_resource",
            PathCategory::ApiCall => "api_call",
            PathCategory::DocumentIndex => "document_index",
            PathCategory::Unmatched => "unmatched",
        }
    }
}

/// Classify a request by its URL path and query.
pub fn classify(request: &RequestDescriptor) -> PathCategory {
    classify_segments(&request.path_segments())
}

/// Classify a raw path (optionally with query) such as `/api/config`.
pub fn classify_path(path: &str) -> PathCategory {
    classify_segments(&split_path(path))
}

fn classify_segments(segments: &[&str]) -> PathCategory {
    let first = segments.first().copied().unwrap_or_default();
    let second = segments.get(1).copied();

    if STATIC_PREFIXES.contains(&first) || (first == "api" && second == Some("config")) {
        PathCategory::StaticResource
    } else if first == "api" {
        PathCategory::ApiCall
    } else if INDEX_ROUTES.contains(&first) {
        PathCategory::DocumentIndex
    } else {
        PathCategory::Unmatched
    }
}
