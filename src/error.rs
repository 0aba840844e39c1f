//! Error types surfaced by the router and the request accessor.
//!
//! Ordinary "no match" is not an error inside the matcher; it only becomes a
//! [`RouterError::NoRouteMatch`] once the whole route table (and every
//! fallback) has been exhausted for a request.

use std::fmt;

use http::Method;

/// Failure raised while dispatching a request through the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// No route entry matched the method and path, and no fallback was
    /// registered to take the request.
    NoRouteMatch {
        /// Method of the unmatched request
        method: Method,
        /// Normalised path of the unmatched request
        path: String,
    },
    /// A handler in the matched chain returned an error or panicked.
    HandlerFailure {
        /// Full pattern of the entry whose chain failed (or the scope of the
        /// middleware/fallback that failed)
        pattern: String,
        /// Rendered error chain or panic payload
        detail: String,
    },
}

impl RouterError {
    /// HTTP status this error is surfaced as.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            RouterError::NoRouteMatch { .. } => 404,
            RouterError::HandlerFailure { .. } => 500,
        }
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::NoRouteMatch { method, path } => {
                write!(f, "no route matched {method} {path}")
            }
            RouterError::HandlerFailure { pattern, detail } => {
                write!(f, "handler for '{pattern}' failed: {detail}")
            }
        }
    }
}

impl std::error::Error for RouterError {}

/// Failure while reading data off a [`Request`](crate::server::Request).
#[derive(Debug)]
pub enum RequestError {
    /// The method token is not a valid HTTP method.
    InvalidMethod(String),
    /// The body was declared as `application/json` but did not parse.
    InvalidJson(serde_json::Error),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidMethod(token) => write!(f, "invalid HTTP method '{token}'"),
            RequestError::InvalidJson(e) => write!(f, "request body is not valid JSON: {e}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::InvalidMethod(_) => None,
            RequestError::InvalidJson(e) => Some(e),
        }
    }
}
