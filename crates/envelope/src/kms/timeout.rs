//! Deadline enforcement for KMS calls.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{KeyWrapClient, KeyWrapError};
use crate::dek::{RawDek, WrappedDek};

/// Decorator that bounds every wrap/unwrap on `inner` by `limit`.
///
/// An expired deadline surfaces as [`KeyWrapError::Timeout`], which callers
/// treat like any other transient key-service failure.
#[derive(Debug)]
pub struct TimeoutKeyWrap<C> {
    inner: C,
    limit: Duration,
}

impl<C> TimeoutKeyWrap<C> {
    /// Wrap `inner` so each call must finish within `limit`.
    pub fn new(inner: C, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<C: KeyWrapClient> KeyWrapClient for TimeoutKeyWrap<C> {
    async fn wrap(&self, raw: &RawDek) -> Result<WrappedDek, KeyWrapError> {
        match tokio::time::timeout(self.limit, self.inner.wrap(raw)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(limit_ms = self.limit.as_millis() as u64, "KMS wrap timed out");
                Err(KeyWrapError::Timeout(self.limit))
            }
        }
    }

    async fn unwrap(&self, wrapped: &WrappedDek) -> Result<RawDek, KeyWrapError> {
        match tokio::time::timeout(self.limit, self.inner.unwrap(wrapped)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(limit_ms = self.limit.as_millis() as u64, "KMS unwrap timed out");
                Err(KeyWrapError::Timeout(self.limit))
            }
        }
    }
}
