//! In-process KEK for development and tests.
//!
//! Wraps DEKs with AES-256-GCM-SIV under a locally supplied 32-byte KEK.
//! Wrapped layout: `nonce(12) || ciphertext+tag(48)`.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use async_trait::async_trait;

use super::{KeyWrapClient, KeyWrapError};
use crate::dek::{DekError, RawDek, WrappedDek, KEY_LEN};

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
const NONCE_LEN: usize = 12;

/// [`KeyWrapClient`] backed by a KEK held in process memory.
pub struct LocalKeyWrap {
    cipher: Aes256GcmSiv,
}

impl LocalKeyWrap {
    /// Build a client from raw KEK bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DekError::InvalidLength`] if `kek` is not [`KEY_LEN`] bytes.
    pub fn new(kek: &[u8]) -> Result<Self, DekError> {
        if kek.len() != KEY_LEN {
            return Err(DekError::InvalidLength(kek.len()));
        }
        let cipher =
            Aes256GcmSiv::new_from_slice(kek).map_err(|_| DekError::InvalidLength(kek.len()))?;
        Ok(Self { cipher })
    }
}

impl std::fmt::Debug for LocalKeyWrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LocalKeyWrap([REDACTED])")
    }
}

#[async_trait]
impl KeyWrapClient for LocalKeyWrap {
    async fn wrap(&self, raw: &RawDek) -> Result<WrappedDek, KeyWrapError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), raw.as_bytes().as_slice())
            .map_err(|_| KeyWrapError::Service("local key wrap failed".into()))?;

        let mut wrapped = Vec::with_capacity(NONCE_LEN + sealed.len());
        wrapped.extend_from_slice(&nonce_bytes);
        wrapped.extend_from_slice(&sealed);
        Ok(WrappedDek::new(wrapped))
    }

    async fn unwrap(&self, wrapped: &WrappedDek) -> Result<RawDek, KeyWrapError> {
        let bytes = wrapped.as_bytes();
        if bytes.len() <= NONCE_LEN {
            return Err(KeyWrapError::UnwrapIntegrity(format!(
                "wrapped key too short: {} bytes",
                bytes.len()
            )));
        }
        let (nonce, sealed) = bytes.split_at(NONCE_LEN);

        let plaintext = zeroize::Zeroizing::new(
            self.cipher
                .decrypt(Nonce::from_slice(nonce), sealed)
                .map_err(|_| KeyWrapError::UnwrapIntegrity("authentication failed".into()))?,
        );

        RawDek::from_slice(&plaintext).map_err(|e| KeyWrapError::UnwrapIntegrity(e.to_string()))
    }
}
