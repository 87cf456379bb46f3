//! Path queries over a JSON status payload.
//!
//! Two syntaxes are accepted:
//!
//! * JSONPath (RFC 9535) when the path starts with `$`: `$.state`,
//!   `$.relays[-1].on`, `$['power state']`, `$.outputs[*].state`, `$..state`.
//! * JSON pointer (RFC 6901) when the path starts with `/`, e.g. `/relays/0/on`.
//!
//! A query returns every matching value; the poller treats the device as
//! heating when any of them equals the configured literal.

use crate::error::{HeatingError, Result};
use serde_json::Value;
use serde_json_path::JsonPath;

#[derive(Debug)]
enum Query {
    Path(JsonPath),
    Pointer(String),
}

/// A parsed status path.
#[derive(Debug)]
pub struct StatusPath {
    query: Query,
}

impl StatusPath {
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        let query = if trimmed.starts_with('/') {
            Query::Pointer(trimmed.to_string())
        } else {
            let parsed = JsonPath::parse(trimmed).map_err(|e| HeatingError::InvalidStatusPath {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
            Query::Path(parsed)
        };
        Ok(Self { query })
    }

    /// All values in `document` matched by this path.
    pub fn query<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        match &self.query {
            Query::Pointer(pointer) => document.pointer(pointer).into_iter().collect(),
            Query::Path(path) => path.query(document).all(),
        }
    }

    /// Whether any matched value strictly equals `expected`.
    pub fn matches(&self, document: &Value, expected: &Value) -> bool {
        self.query(document).into_iter().any(|value| value == expected)
    }
}
