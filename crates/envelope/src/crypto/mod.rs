//! AES-256-GCM field encryption primitives.
//!
//! This module is intentionally free of KMS and I/O dependencies.
//! It provides the low-level encrypt/decrypt operations used by the encryptor.
//!
//! # Ciphertext format
//!
//! ```text
//! nonce (16 bytes) || tag (16 bytes) || ciphertext (len(plaintext) bytes)
//! ```
//!
//! There is no version byte and no padding; the layout is fixed so that stored
//! blobs stay readable by other implementations of the same format.

pub mod cipher;

pub use cipher::{
    decrypt_field, encrypt_field, open_bytes, CipherEnvelope, CipherError, MIN_ENVELOPE_LEN,
    NONCE_LEN, TAG_LEN,
};
