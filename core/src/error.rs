//! Error types for the todo API client.
//!
//! # Design
//! `TransportError` means no response was obtained at all. Everything that
//! happens after a response arrives lands in `ApiError`: a non-2xx status,
//! an envelope with `success: false`, a body that is not an envelope, or an
//! envelope missing the payload the operation needs.

use thiserror::Error;

/// Failure to obtain any HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Errors returned by `TodoClient` parse methods and the store's round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server returned a status outside 2xx.
    #[error("request failed with status code {status}")]
    Http { status: u16, message: Option<String> },

    /// The envelope carried `success: false`.
    #[error("{}", .message.as_deref().unwrap_or("request rejected by server"))]
    Rejected { message: Option<String> },

    /// The envelope reported success but lacked the named field.
    #[error("response is missing '{0}'")]
    MissingPayload(&'static str),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// Message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Http { message, .. } | ApiError::Rejected { message } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }

    /// Text to show the user: the server's message, else this error's own
    /// description, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        match self {
            ApiError::Rejected { .. } => fallback.to_string(),
            other => {
                let own = other.to_string();
                if own.trim().is_empty() {
                    fallback.to_string()
                } else {
                    own
                }
            }
        }
    }
}
