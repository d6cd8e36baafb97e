//! Error types for the catalog client.

use thiserror::Error;

/// Errors that can occur when calling the catalog API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure (connect, timeout, body read)
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body was not the expected JSON
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// True when the server reported the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status: 404, .. })
    }

    /// True when the request hit its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Http(e) if e.is_timeout())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Status {
            status: 404,
            url: "http://x/objects/2".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from http://x/objects/2");
        assert!(err.is_not_found());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<i32>("nope").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::Parse(_)));
    }
}
