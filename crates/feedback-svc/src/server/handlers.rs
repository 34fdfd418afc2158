//! Axum request handlers for all service endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    CreateFeedbackRequest, CreateFeedbackResponse, ErrorResponse, FeedbackResponse, HealthResponse,
};
use common::ServiceError;
use envelope::{EnvelopeError, PlaintextFeedback};
use tracing::{error, info, warn};

use super::state::AppState;
use crate::store::StoreError;

/// `POST /api/feedback`: seal and store a new feedback record.
///
/// The customer email doubles as the identifier the record's DEK is derived
/// from. Nothing is stored unless sealing succeeds.
pub async fn create_feedback(
    State(state): State<AppState>,
    payload: Result<Json<CreateFeedbackRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(ServiceError::BadRequest(rejection.body_text()));
        }
    };

    let fields = PlaintextFeedback {
        email: req.email,
        contact_number: req.contact_number,
        feedback: req.feedback,
    };

    let record = match state.encryptor.seal_record(&fields.email, &fields).await {
        Ok(r) => r,
        Err(e) => return error_response(envelope_error(&e)),
    };

    let id = match state.repository.insert(record).await {
        Ok(id) => id,
        Err(e) => return error_response(store_error(&e)),
    };

    info!(record_id = id, "feedback stored");
    (StatusCode::CREATED, Json(CreateFeedbackResponse { id })).into_response()
}

/// `GET /api/feedback/{id}`: load and open a stored record.
///
/// Requires the configured API token in the `Authorization` header. The token
/// is checked before the id is parsed.
pub async fn get_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> Response {
    if !state.api_token.authorize(&headers) {
        return error_response(ServiceError::Unauthorized);
    }
    let id = match path {
        Ok(Path(id)) => id,
        Err(rejection) => {
            return error_response(ServiceError::BadRequest(rejection.body_text()));
        }
    };

    let record = match state.repository.get(id).await {
        Ok(Some(r)) => r,
        Ok(None) => return error_response(ServiceError::NotFound(format!("feedback {id}"))),
        Err(e) => return error_response(store_error(&e)),
    };

    let plaintext = match state.encryptor.open_record(&record).await {
        Ok(p) => p,
        Err(e) => {
            warn!(record_id = id, kind = e.kind(), "failed to open record");
            return error_response(envelope_error(&e));
        }
    };

    let body = FeedbackResponse {
        email: plaintext.email,
        contact_number: plaintext.contact_number,
        feedback: plaintext.feedback,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// `GET /health`: liveness check.
pub async fn health(State(state): State<AppState>) -> Response {
    let records_stored = match state.repository.count().await {
        Ok(n) => n,
        Err(e) => return error_response(store_error(&e)),
    };
    let body = HealthResponse {
        status: "ok".into(),
        kms_backend: state.kms_backend.into(),
        records_stored,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map a seal/open failure onto the public error taxonomy.
///
/// Messages are fixed strings: KMS and cipher details stay in the logs.
fn envelope_error(err: &EnvelopeError) -> ServiceError {
    match err {
        EnvelopeError::KeyService(_) => {
            ServiceError::Unavailable("key service unavailable, retry later".into())
        }
        EnvelopeError::UnwrapIntegrity(_)
        | EnvelopeError::Integrity { .. }
        | EnvelopeError::MalformedEnvelope { .. }
        | EnvelopeError::Encoding { .. } => {
            error!(kind = err.kind(), "stored record failed integrity check");
            ServiceError::IntegrityFailure("stored record failed integrity check".into())
        }
        EnvelopeError::EncryptionFailure { .. } => {
            ServiceError::EncryptionFailure("encryption failed".into())
        }
    }
}

fn store_error(err: &StoreError) -> ServiceError {
    error!(error = %err, "storage failure");
    ServiceError::Internal("storage failure".into())
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match &err {
        ServiceError::Unauthorized => "missing or invalid API token".to_owned(),
        ServiceError::BadRequest(m)
        | ServiceError::NotFound(m)
        | ServiceError::IntegrityFailure(m)
        | ServiceError::EncryptionFailure(m)
        | ServiceError::Unavailable(m)
        | ServiceError::Internal(m) => m.clone(),
    };
    (status, Json(ErrorResponse::new(err.code(), message))).into_response()
}
