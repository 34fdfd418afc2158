//! Key-wrapping boundary to the external key-management service.
//!
//! The KMS holds the Key Encryption Key (KEK). This crate only ever asks it to
//! wrap a [`RawDek`] or unwrap a [`WrappedDek`]; key creation, rotation and
//! policy live entirely on the KMS side.
//!
//! Implementations must be safe to share across concurrent seal/open calls.
//! None of them retry: retry policy belongs to the caller, guided by
//! [`KeyWrapError::is_retryable`].

pub mod local;
pub mod timeout;

pub use local::LocalKeyWrap;
pub use timeout::TimeoutKeyWrap;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::dek::{RawDek, WrappedDek};

/// Errors produced at the KMS boundary.
#[derive(Debug, Error)]
pub enum KeyWrapError {
    /// Network, authentication or availability failure talking to the KMS.
    #[error("key service failure: {0}")]
    Service(String),

    /// The KMS call did not complete within the configured deadline.
    #[error("key service call timed out after {0:?}")]
    Timeout(Duration),

    /// The wrapped key is corrupt, belongs to a different KEK, or unwrapped to
    /// something that is not a DEK.
    #[error("wrapped key failed integrity check: {0}")]
    UnwrapIntegrity(String),
}

impl KeyWrapError {
    /// `true` for failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KeyWrapError::Service(_) | KeyWrapError::Timeout(_))
    }
}

/// Wrap/unwrap capability against an already-provisioned KEK.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyWrapClient: Send + Sync {
    /// Encrypt `raw` under the KEK.
    async fn wrap(&self, raw: &RawDek) -> Result<WrappedDek, KeyWrapError>;

    /// Decrypt `wrapped` under the KEK back into a [`RawDek`].
    async fn unwrap(&self, wrapped: &WrappedDek) -> Result<RawDek, KeyWrapError>;
}
