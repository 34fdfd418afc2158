//! Error taxonomy for seal and open operations.

use thiserror::Error;

use crate::crypto::CipherError;
use crate::kms::KeyWrapError;
use crate::record::Field;

/// Every way a seal or open can fail.
///
/// Variants are never collapsed into one another so callers can tell a
/// transient KMS outage apart from tampered or corrupted data.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The KMS could not be reached, rejected our credentials, or timed out.
    #[error("key service unavailable: {0}")]
    KeyService(String),

    /// The stored wrapped DEK could not be unwrapped under the current KEK.
    #[error("wrapped DEK failed integrity check: {0}")]
    UnwrapIntegrity(String),

    /// A field's authentication tag did not verify.
    #[error("integrity check failed for field {field}")]
    Integrity { field: Field },

    /// A stored field is shorter than the minimum envelope size.
    #[error("malformed envelope for field {field}: {len} bytes")]
    MalformedEnvelope { field: Field, len: usize },

    /// A field authenticated but its plaintext is not valid UTF-8.
    #[error("field {field} decrypted to invalid UTF-8")]
    Encoding { field: Field },

    /// AEAD encryption itself failed.
    #[error("encryption failed for field {field}")]
    EncryptionFailure { field: Field },
}

impl EnvelopeError {
    /// Stable, log-safe identifier for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EnvelopeError::KeyService(_) => "key_service",
            EnvelopeError::UnwrapIntegrity(_) => "unwrap_integrity",
            EnvelopeError::Integrity { .. } => "integrity",
            EnvelopeError::MalformedEnvelope { .. } => "malformed_envelope",
            EnvelopeError::Encoding { .. } => "encoding",
            EnvelopeError::EncryptionFailure { .. } => "encryption_failure",
        }
    }

    /// `true` only for transient key-service failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EnvelopeError::KeyService(_))
    }

    /// Attach the failing field to a cipher-layer error.
    pub(crate) fn from_cipher(field: Field, err: CipherError) -> Self {
        match err {
            CipherError::MalformedEnvelope(len) => EnvelopeError::MalformedEnvelope { field, len },
            CipherError::Integrity => EnvelopeError::Integrity { field },
            CipherError::Encoding(_) => EnvelopeError::Encoding { field },
            CipherError::AeadFailure => EnvelopeError::EncryptionFailure { field },
        }
    }
}

impl From<KeyWrapError> for EnvelopeError {
    fn from(err: KeyWrapError) -> Self {
        match err {
            KeyWrapError::UnwrapIntegrity(msg) => EnvelopeError::UnwrapIntegrity(msg),
            other @ (KeyWrapError::Service(_) | KeyWrapError::Timeout(_)) => {
                EnvelopeError::KeyService(other.to_string())
            }
        }
    }
}
