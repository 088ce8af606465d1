use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PadoruError {
    #[error("Malformed collection document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Collection has no entries")]
    EmptyCollection,
}

pub type Result<T> = std::result::Result<T, PadoruError>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl PadoruError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PadoruError::Io {
            path: path.into(),
            source,
        }
    }

    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(url: &str, status: reqwest::StatusCode, body: &str) -> Self {
        PadoruError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }

    /// True for failures that happened while talking to a remote host.
    pub fn is_network(&self) -> bool {
        matches!(self, PadoruError::Network(_) | PadoruError::HttpStatus { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_truncates_long_bodies() {
        let body = "x".repeat(800);
        let err = PadoruError::from_status("https://example.org/a.json", reqwest::StatusCode::NOT_FOUND, &body);
        match err {
            PadoruError::HttpStatus { status, body, .. } => {
                assert_eq!(status, 404);
                assert!(body.starts_with(&"x".repeat(500)));
                assert!(body.ends_with("(truncated, 800 total bytes)"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        // 'é' is two bytes, so byte 500 falls inside a character
        let body = format!("a{}", "é".repeat(400));
        let truncated = PadoruError::truncate_body(&body);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_is_network() {
        let status = PadoruError::from_status("u", reqwest::StatusCode::BAD_GATEWAY, "");
        assert!(status.is_network());
        assert!(!PadoruError::InvalidState("x".into()).is_network());
    }
}
