use thiserror::Error;

use super::transport::TransportError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Login rejected by the backend; message passed through when present.
    #[error("{0}")]
    Login(String),

    #[error("Unauthorized - session expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Backend rejected the payload (validation error, duplicate UPIN, ...).
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data around.
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

    /// Pull the backend's human-readable message out of an error payload.
    /// DRF uses `detail`; the record views use `error`.
    pub(crate) fn backend_detail(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        for key in ["detail", "error"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return Some(message.to_string());
            }
        }
        None
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let message = Self::backend_detail(body).unwrap_or_else(|| Self::truncate_body(body));
        match status {
            400 => ApiError::Rejected(message),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            500..=599 => ApiError::Server(message),
            _ => ApiError::InvalidResponse(format!("Status {status}: {message}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(ApiError::from_status(401, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(403, "nope"), ApiError::AccessDenied(_)));
        assert!(matches!(ApiError::from_status(404, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(400, "bad"), ApiError::Rejected(_)));
        assert!(matches!(ApiError::from_status(502, ""), ApiError::Server(_)));
        assert!(matches!(ApiError::from_status(302, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn backend_detail_is_preferred() {
        let err = ApiError::from_status(400, r#"{"error": "A record with UPIN 'X' already exists."}"#);
        match err {
            ApiError::Rejected(message) => {
                assert_eq!(message, "A record with UPIN 'X' already exists.")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn long_bodies_are_truncated_on_char_boundaries() {
        let body = "ሀ".repeat(400); // 3 bytes each
        let err = ApiError::from_status(500, &body);
        let text = err.to_string();
        assert!(text.contains("truncated"));
        assert!(text.len() < body.len());
    }
}
