//! AES-256-GCM encryption and decryption of individual string fields.
//!
//! **Algorithm choice:** AES-256-GCM with a 128-bit nonce. A non-96-bit nonce
//! is run through GHASH to form the initial counter block, as NIST SP 800-38D
//! prescribes, so envelopes written by any conforming GCM implementation with
//! the same layout open here.
//!
//! **Never reuse a nonce under the same DEK.** GCM nonce reuse is catastrophic:
//! it breaks both confidentiality and authentication. Every call to
//! [`encrypt_field`] draws a fresh nonce from the OS CSPRNG.

use aes_gcm::{
    aead::{
        generic_array::{typenum::U16, GenericArray},
        rand_core::RngCore,
        AeadInPlace, KeyInit, OsRng,
    },
    aes::Aes256,
    AesGcm,
};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::dek::RawDek;

/// AES-256-GCM parameterised with a 16-byte nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Byte length of the nonce prefix (16 bytes = 128 bits).
pub const NONCE_LEN: usize = 16;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Smallest valid envelope: nonce + tag + zero bytes of ciphertext.
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + TAG_LEN;

/// A parsed, encrypted field value.
///
/// The byte representation is `nonce(16) || tag(16) || ciphertext(n)` where
/// `n` equals the length of the UTF-8 plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherEnvelope {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// GCM authentication tag.
    pub tag: [u8; TAG_LEN],
    /// Ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
}

impl CipherEnvelope {
    /// Encode this value to its canonical byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_ENVELOPE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse stored bytes back into a [`CipherEnvelope`].
    ///
    /// Only the length is checked here; authenticity is established by
    /// [`decrypt_field`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::MalformedEnvelope`] if `bytes` is shorter than
    /// [`MIN_ENVELOPE_LEN`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return Err(CipherError::MalformedEnvelope(bytes.len()));
        }
        let (nonce_bytes, rest) = bytes.split_at(NONCE_LEN);
        let (tag_bytes, ciphertext) = rest.split_at(TAG_LEN);

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(tag_bytes);

        Ok(Self {
            nonce,
            tag,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Total encoded length in bytes.
    pub fn len(&self) -> usize {
        MIN_ENVELOPE_LEN + self.ciphertext.len()
    }

    /// Returns `true` if the envelope carries no ciphertext (empty plaintext).
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }
}

impl std::fmt::Debug for CipherEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherEnvelope")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The stored value is shorter than nonce + tag.
    #[error("malformed envelope: {0} bytes is shorter than the {MIN_ENVELOPE_LEN}-byte minimum")]
    MalformedEnvelope(usize),

    /// The authentication tag did not verify: wrong key, tampering, or corruption.
    #[error("authentication tag mismatch")]
    Integrity,

    /// The verified plaintext is not valid UTF-8.
    #[error("decrypted plaintext is not valid UTF-8")]
    Encoding(std::str::Utf8Error),

    /// AES-GCM encryption failed (only reachable with a plaintext beyond the
    /// GCM length limit).
    #[error("aead operation failed")]
    AeadFailure,
}

/// Encrypt a plaintext string field using AES-256-GCM.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (should be
/// unreachable for any realistic field length).
pub fn encrypt_field(plaintext: &str, dek: &RawDek) -> Result<CipherEnvelope, CipherError> {
    let cipher = build_cipher(dek);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", &mut buffer)
        .map_err(|_| CipherError::AeadFailure)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(CipherEnvelope {
        nonce,
        tag: tag_bytes,
        ciphertext: buffer,
    })
}

/// Decrypt a [`CipherEnvelope`] back to the original string.
///
/// No plaintext is returned unless the tag verifies.
///
/// # Errors
///
/// Returns [`CipherError::Integrity`] if authentication fails and
/// [`CipherError::Encoding`] if the authenticated bytes are not UTF-8.
pub fn decrypt_field(envelope: &CipherEnvelope, dek: &RawDek) -> Result<String, CipherError> {
    let cipher = build_cipher(dek);

    let mut buffer = envelope.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&envelope.nonce),
            b"",
            &mut buffer,
            GenericArray::from_slice(&envelope.tag),
        )
        .map_err(|_| CipherError::Integrity)?;

    String::from_utf8(buffer).map_err(|e| {
        let reason = e.utf8_error();
        drop(Zeroizing::new(e.into_bytes()));
        CipherError::Encoding(reason)
    })
}

/// Parse and decrypt a stored envelope in one step.
///
/// # Errors
///
/// Any [`CipherError`] from [`CipherEnvelope::from_bytes`] or [`decrypt_field`].
pub fn open_bytes(bytes: &[u8], dek: &RawDek) -> Result<String, CipherError> {
    let envelope = CipherEnvelope::from_bytes(bytes)?;
    decrypt_field(&envelope, dek)
}

fn build_cipher(dek: &RawDek) -> Aes256Gcm16 {
    Aes256Gcm16::new(GenericArray::from_slice(dek.as_bytes()))
}
