//! Request and response types exchanged over the public HTTP API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Feedback endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /api/feedback`.
///
/// All three fields are required and are encrypted before anything is stored.
#[derive(Clone, Serialize, Deserialize)]
pub struct CreateFeedbackRequest {
    /// Customer email; also the identifier the record's DEK is derived from.
    pub email: String,
    /// Customer contact number.
    pub contact_number: String,
    /// Free-text feedback.
    pub feedback: String,
}

impl std::fmt::Debug for CreateFeedbackRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CreateFeedbackRequest([REDACTED])")
    }
}

/// Successful response body for `POST /api/feedback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeedbackResponse {
    /// Identity assigned by storage.
    pub id: i64,
}

/// Successful response body for `GET /api/feedback/{id}`.
#[derive(Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub email: String,
    pub contact_number: String,
    pub feedback: String,
}

impl std::fmt::Debug for FeedbackResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FeedbackResponse([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"`.
    pub status: String,
    /// Which key-wrap backend is configured (`"aws"` or `"local"`).
    pub kms_backend: String,
    /// Number of sealed records currently held by storage.
    pub records_stored: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_requires_all_fields() {
        let ok: Result<CreateFeedbackRequest, _> = serde_json::from_value(json!({
            "email": "u@example.com",
            "contact_number": "+15551234567",
            "feedback": "great service"
        }));
        assert_eq!(ok.unwrap().contact_number, "+15551234567");

        let missing: Result<CreateFeedbackRequest, _> =
            serde_json::from_value(json!({"email": "u@example.com"}));
        assert!(missing.is_err());
    }

    #[test]
    fn requests_are_redacted_in_debug() {
        let req = CreateFeedbackRequest {
            email: "u@example.com".into(),
            contact_number: "+1".into(),
            feedback: "x".into(),
        };
        assert!(!format!("{req:?}").contains("u@example.com"));
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("bad_request", "missing field");
        assert_eq!(e.code, "bad_request");
        assert!(e.message.contains("missing field"));
    }

    #[test]
    fn health_response_serde() {
        let h = HealthResponse {
            status: "ok".into(),
            kms_backend: "local".into(),
            records_stored: 3,
        };
        let json = serde_json::to_string(&h).unwrap();
        let decoded: HealthResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.records_stored, 3);
        assert_eq!(decoded.kms_backend, "local");
    }
}
