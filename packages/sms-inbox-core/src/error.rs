//! # Error Handling
//!
//! Errors surfaced to the client when talking to the inbox server.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error                                                                 │
//! │  ├── Unauthorized   - 401 from the server (no/expired session)         │
//! │  ├── BadRequest     - 400 from the server (missing filter, bad cursor) │
//! │  ├── Server         - any other non-2xx, message passed through        │
//! │  ├── Transport      - request never produced a response                │
//! │  ├── Decode         - response body was not the expected JSON          │
//! │  └── Validation     - rejected locally before any request was made     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are retried automatically. A failed send is kept in the
//! thread as a failed entry and the user decides whether to retry.

use thiserror::Error;

/// Result type alias for inbox client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the inbox client data layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The session is missing or has expired
    #[error("Not signed in. Log in through the browser and try again.")]
    Unauthorized,

    /// The server rejected the request parameters
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The server (or the SMS provider behind it) reported a failure
    #[error("{message}")]
    Server {
        /// HTTP status returned by the inbox server
        status: u16,
        /// Error message from the response body
        message: String,
    },

    /// The request could not be delivered
    #[error("Network error: {0}")]
    Transport(String),

    /// The response could not be parsed
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Input rejected before sending
    #[error("{0}")]
    Validation(String),
}

impl Error {
    /// Build an error from a non-success HTTP status and its body text.
    ///
    /// The body is expected to be `{"error": "..."}`; anything else is used
    /// verbatim so provider messages are never lost.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<crate::message::ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_string());

        match status {
            401 => Error::Unauthorized,
            400 => Error::BadRequest(message),
            _ => Error::Server { status, message },
        }
    }

    /// Whether this error means the user has to sign in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_json_body() {
        let err = Error::from_status(500, r#"{"error":"The 'To' number is not valid."}"#);
        assert_eq!(
            err,
            Error::Server {
                status: 500,
                message: "The 'To' number is not valid.".to_string()
            }
        );
        assert_eq!(err.to_string(), "The 'To' number is not valid.");
    }

    #[test]
    fn test_from_status_plain_body() {
        let err = Error::from_status(502, "Bad Gateway\n");
        assert_eq!(
            err,
            Error::Server {
                status: 502,
                message: "Bad Gateway".to_string()
            }
        );
    }

    #[test]
    fn test_from_status_maps_auth_and_validation() {
        assert!(Error::from_status(401, r#"{"error":"unauthenticated"}"#).is_unauthorized());
        assert_eq!(
            Error::from_status(400, r#"{"error":"from or to is required"}"#),
            Error::BadRequest("from or to is required".to_string())
        );
    }
}
