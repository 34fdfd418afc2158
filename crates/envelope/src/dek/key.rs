//! [`RawDek`] and [`WrappedDek`]: the two shapes a Data Encryption Key takes.

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Errors produced when building a [`RawDek`] from untrusted bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DekError {
    /// The key material has an unexpected length.
    #[error("DEK has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Plaintext 256-bit Data Encryption Key.
///
/// Owned by exactly one seal or open operation. The buffer is overwritten with
/// zeroes when the value is dropped, so the key never outlives the call that
/// derived or unwrapped it. Deliberately not `Clone`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RawDek([u8; KEY_LEN]);

impl RawDek {
    /// Take ownership of exactly [`KEY_LEN`] bytes of key material.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy key material out of a slice.
    ///
    /// # Errors
    ///
    /// Returns [`DekError::InvalidLength`] if the slice is not [`KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DekError> {
        if bytes.len() != KEY_LEN {
            return Err(DekError::InvalidLength(bytes.len()));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl PartialEq for RawDek {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for RawDek {}

impl std::fmt::Debug for RawDek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("RawDek([REDACTED])")
    }
}

/// A [`RawDek`] encrypted under the KMS-held Key Encryption Key.
///
/// Opaque bytes of KMS-defined length. This is the only form of the DEK that
/// is ever persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct WrappedDek(Vec<u8>);

impl WrappedDek {
    /// Wrap bytes returned by the KMS (or loaded from storage).
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the wrapped key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the underlying byte vector, for persistence.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the KMS returned an empty blob.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for WrappedDek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WrappedDek({} bytes)", self.0.len())
    }
}
