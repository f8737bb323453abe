//! Synthetic error responses for intercepted requests.
//!
//! When the proxy cannot produce a response for a request it intercepted,
//! the caller receives a `502 Bad Gateway` with a small JSON body instead of
//! a raw transport error.

use cachefront_core::Error;
use serde::{Deserialize, Serialize};

/// Body of the synthetic response: `{ "code": "CANNOT_LOAD", "message": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CannotLoad {
    pub code: String,
    pub message: String,
}

impl CannotLoad {
    pub const CODE: &'static str = "CANNOT_LOAD";

    /// HTTP status the synthetic response is delivered with.
    pub const STATUS: u16 = 502;

    pub fn new(message: impl Into<String>) -> Self {
        Self { code: Self::CODE.to_string(), message: message.into() }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!(r#"{{"code":"{}"}}"#, Self::CODE))
    }
}

impl From<Error> for CannotLoad {
    fn from(err: Error) -> Self {
        CannotLoad::new(err.message())
    }
}
