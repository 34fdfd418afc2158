//! Data Encryption Key types and derivation.
//!
//! # Lifecycle
//!
//! 1. [`derive`] turns a stable record identifier (the customer's email) into a
//!    [`RawDek`].
//! 2. The KMS wraps the raw key into a [`WrappedDek`], which is persisted with
//!    the record.
//! 3. On read, the KMS unwraps it back into a [`RawDek`] for the duration of a
//!    single open operation.
//!
//! # Security invariants
//!
//! - A [`RawDek`] is **never** persisted, logged, or included in traces.
//! - A [`RawDek`] is zeroed as soon as it is dropped.
//! - Derivation is deterministic: two records sharing an identifier share a
//!   raw DEK before wrapping.

pub mod key;

pub use key::{DekError, RawDek, WrappedDek, KEY_LEN};

use sha2::{Digest, Sha256};

/// Derive the raw DEK for `identifier` as the SHA-256 digest of its UTF-8 bytes.
///
/// Pure and infallible; the empty string yields a well-defined key.
pub fn derive(identifier: &str) -> RawDek {
    let digest = Sha256::digest(identifier.as_bytes());
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&digest);
    RawDek::from_bytes(key)
}
