//! Envelope encryption for customer feedback records.
//!
//! Each record's sensitive fields are sealed with AES-256-GCM under a Data
//! Encryption Key (DEK). The DEK is wrapped by a Key Encryption Key held in an
//! external KMS and stored beside the ciphertexts; the raw DEK itself is never
//! persisted and is zeroed as soon as an operation finishes.
//!
//! ```text
//! identifier ──derive──▶ RawDek ──KMS wrap──▶ WrappedDek ─┐
//!                          │                               ├─▶ FeedbackRecord
//!   fields ──AES-256-GCM───┘──▶ nonce‖tag‖ciphertext ×3 ──┘
//! ```

pub mod crypto;
pub mod dek;
pub mod encryptor;
pub mod error;
pub mod kms;
pub mod record;

pub use dek::{RawDek, WrappedDek};
pub use encryptor::EnvelopeEncryptor;
pub use error::EnvelopeError;
pub use kms::{KeyWrapClient, KeyWrapError};
pub use record::{FeedbackRecord, Field, PlaintextFeedback};
