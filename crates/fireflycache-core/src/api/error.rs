use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// A GET or PUT that came back with a non-2xx status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Request failed with status {status}: {message}")]
pub struct RequestError {
    pub status: u16,
    pub message: String,
}

impl RequestError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..end],
            body.len()
        )
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown status");
        let message = if body.trim().is_empty() {
            reason.to_string()
        } else {
            format!("{}: {}", reason, Self::truncate_body(body))
        };
        Self {
            status: status.as_u16(),
            message,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_uses_reason_when_body_empty() {
        let err = RequestError::from_status(reqwest::StatusCode::NOT_FOUND, "  ");
        assert_eq!(err.status, 404);
        assert_eq!(err.message, "Not Found");
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = RequestError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(err.message.contains("truncated, 2000 total bytes"));
        assert!(err.message.len() < 600);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let body = "é".repeat(400);
        let err = RequestError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        assert!(err.message.starts_with("Bad Gateway: é"));
    }

    #[test]
    fn test_unauthorized() {
        let err = RequestError::from_status(reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(err.is_unauthorized());
    }
}
