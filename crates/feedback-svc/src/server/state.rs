//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use envelope::EnvelopeEncryptor;

use super::middleware::ApiToken;
use crate::store::FeedbackRepository;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Seals and opens records through the configured KMS.
    pub encryptor: EnvelopeEncryptor,
    /// Storage for sealed records.
    pub repository: Arc<dyn FeedbackRepository>,
    /// Token required to read records back.
    pub api_token: ApiToken,
    /// Name of the configured key-wrap backend, reported by `/health`.
    pub kms_backend: &'static str,
}

impl AppState {
    /// Create a new [`AppState`].
    pub fn new(
        encryptor: EnvelopeEncryptor,
        repository: Arc<dyn FeedbackRepository>,
        api_token: ApiToken,
        kms_backend: &'static str,
    ) -> Self {
        Self {
            encryptor,
            repository,
            api_token,
            kms_backend,
        }
    }
}
