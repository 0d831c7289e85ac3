//! Errors from talking to the REST API.

use reqwest::StatusCode;
use thiserror::Error;

use super::query::QueryError;

/// Errors that can occur when calling the API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("Could not reach the API: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not what the page expected.
    #[error("Unexpected API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The query has no matching endpoint.
    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    /// The bearer token is missing, expired or revoked.
    #[error("Your session has expired. Please sign in again.")]
    Unauthorized,

    /// The officer's role does not allow the operation.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate record or illegal status change.
    #[error("{0}")]
    Conflict(String),

    /// Any other non-success status, with the API's message.
    #[error("{message}")]
    Api { status: StatusCode, message: String },
}

impl ClientError {
    /// Map an error response to a variant. `message` is the API's
    /// `{"error": ...}` text when the body had one.
    #[must_use]
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            _ => Self::Api { status, message },
        }
    }

    /// Whether the fault lies with this service or the API rather than with
    /// what the officer submitted.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Decode(_) | Self::Query(_) => true,
            Self::Api { status, .. } => status.is_server_error(),
            Self::Unauthorized | Self::Forbidden(_) | Self::NotFound(_) | Self::Conflict(_) => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_known_codes() {
        assert!(matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, Some("Invalid token".into())),
            ClientError::Unauthorized
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::CONFLICT, Some("Item is already destroyed".into())),
            ClientError::Conflict(ref m) if m == "Item is already destroyed"
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::NOT_FOUND, None),
            ClientError::NotFound(ref m) if m == "Not Found"
        ));
    }

    #[test]
    fn test_api_message_is_displayed_verbatim() {
        let err = ClientError::from_status(
            StatusCode::BAD_REQUEST,
            Some("Quantity must be greater than zero".into()),
        );
        assert_eq!(err.to_string(), "Quantity must be greater than zero");
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_server_errors() {
        let err = ClientError::from_status(StatusCode::BAD_GATEWAY, None);
        assert!(err.is_server_error());
        assert!(!ClientError::Unauthorized.is_server_error());
    }
}
