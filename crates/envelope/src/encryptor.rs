//! [`EnvelopeEncryptor`]: seals plaintext feedback into storable records and
//! opens them again.
//!
//! # Seal
//!
//! 1. Derive the raw DEK from the record identifier.
//! 2. Wrap it with the KMS.
//! 3. Encrypt email, contact number and feedback text, in that order.
//! 4. Stamp both timestamps with the same instant; leave the id unassigned.
//!
//! # Open
//!
//! 1. Unwrap the record's DEK with the KMS.
//! 2. Decrypt the three fields in the same order. Any failure aborts the whole
//!    open; partially decrypted records are never returned.
//!
//! The raw DEK is dropped, and therefore zeroed, before either call returns.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::crypto::{encrypt_field, open_bytes};
use crate::dek;
use crate::error::EnvelopeError;
use crate::kms::KeyWrapClient;
use crate::record::{FeedbackRecord, Field, PlaintextFeedback};

/// Stateless orchestrator over an injected [`KeyWrapClient`].
///
/// Cheap to clone and safe to share across tasks; the KMS client is the only
/// long-lived resource it holds.
#[derive(Clone)]
pub struct EnvelopeEncryptor {
    kms: Arc<dyn KeyWrapClient>,
}

impl EnvelopeEncryptor {
    /// Build an encryptor that wraps and unwraps DEKs through `kms`.
    pub fn new(kms: Arc<dyn KeyWrapClient>) -> Self {
        Self { kms }
    }

    /// Seal `fields` into a [`FeedbackRecord`] keyed by `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyService`] if the KMS wrap fails. No record is
    /// produced in that case.
    #[instrument(skip_all, fields(op_id = %uuid::Uuid::new_v4()))]
    pub async fn seal_record(
        &self,
        identifier: &str,
        fields: &PlaintextFeedback,
    ) -> Result<FeedbackRecord, EnvelopeError> {
        let raw = dek::derive(identifier);

        let wrapped_dek = self.kms.wrap(&raw).await.map_err(|e| {
            let e = EnvelopeError::from(e);
            warn!(kind = e.kind(), "DEK wrap failed");
            e
        })?;

        let seal = |field: Field| {
            encrypt_field(fields.get(field), &raw)
                .map(|envelope| envelope.to_bytes())
                .map_err(|e| EnvelopeError::from_cipher(field, e))
        };
        let email = seal(Field::Email)?;
        let contact_number = seal(Field::ContactNumber)?;
        let feedback = seal(Field::FeedbackText)?;

        let now = Utc::now();
        debug!(wrapped_dek_len = wrapped_dek.len(), "record sealed");

        Ok(FeedbackRecord {
            id: None,
            wrapped_dek,
            email,
            contact_number,
            feedback,
            created_at: now,
            updated_at: now,
        })
    }

    /// Unwrap the DEK of `record` and decrypt all three fields.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::KeyService`] / [`EnvelopeError::UnwrapIntegrity`] from the KMS.
    /// - [`EnvelopeError::MalformedEnvelope`], [`EnvelopeError::Integrity`] or
    ///   [`EnvelopeError::Encoding`] for the first field that fails, in seal order.
    #[instrument(skip_all, fields(op_id = %uuid::Uuid::new_v4(), record_id = ?record.id))]
    pub async fn open_record(
        &self,
        record: &FeedbackRecord,
    ) -> Result<PlaintextFeedback, EnvelopeError> {
        let raw = self.kms.unwrap(&record.wrapped_dek).await.map_err(|e| {
            let e = EnvelopeError::from(e);
            warn!(kind = e.kind(), "DEK unwrap failed");
            e
        })?;

        let open = |field: Field| {
            open_bytes(record.envelope(field), &raw).map_err(|e| {
                let e = EnvelopeError::from_cipher(field, e);
                warn!(kind = e.kind(), field = field.as_str(), "field decryption failed");
                e
            })
        };
        let email = open(Field::Email)?;
        let contact_number = open(Field::ContactNumber)?;
        let feedback = open(Field::FeedbackText)?;

        debug!("record opened");
        Ok(PlaintextFeedback {
            email,
            contact_number,
            feedback,
        })
    }
}

impl std::fmt::Debug for EnvelopeEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeEncryptor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MIN_ENVELOPE_LEN;
    use crate::dek::{RawDek, WrappedDek};
    use crate::kms::{KeyWrapError, LocalKeyWrap, MockKeyWrapClient};

    /// Mock KMS whose wrapped form is the raw key itself.
    fn identity_kms() -> MockKeyWrapClient {
        let mut kms = MockKeyWrapClient::new();
        kms.expect_wrap()
            .returning(|raw| Ok(WrappedDek::new(raw.as_bytes().to_vec())));
        kms.expect_unwrap().returning(|wrapped| {
            RawDek::from_slice(wrapped.as_bytes())
                .map_err(|e| KeyWrapError::UnwrapIntegrity(e.to_string()))
        });
        kms
    }

    fn sample() -> PlaintextFeedback {
        PlaintextFeedback::new("u@example.com", "+15551234567", "great service")
    }

    #[tokio::test]
    async fn seal_open_round_trip() {
        let enc = EnvelopeEncryptor::new(Arc::new(identity_kms()));
        let fields = sample();
        let record = enc.seal_record("u@example.com", &fields).await.unwrap();

        assert_eq!(record.id, None);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.email.len(), MIN_ENVELOPE_LEN + "u@example.com".len());
        assert_eq!(record.contact_number.len(), MIN_ENVELOPE_LEN + "+15551234567".len());
        assert_eq!(record.feedback.len(), MIN_ENVELOPE_LEN + "great service".len());

        assert_eq!(enc.open_record(&record).await.unwrap(), fields);
    }

    #[tokio::test]
    async fn wraps_the_derived_key() {
        let mut kms = MockKeyWrapClient::new();
        kms.expect_wrap()
            .withf(|raw| raw.as_bytes() == dek::derive("u@example.com").as_bytes())
            .times(1)
            .returning(|_| Ok(WrappedDek::new(vec![0xAA; 8])));
        let enc = EnvelopeEncryptor::new(Arc::new(kms));
        let record = enc.seal_record("u@example.com", &sample()).await.unwrap();
        assert_eq!(record.wrapped_dek.as_bytes(), &[0xAA; 8]);
    }

    #[tokio::test]
    async fn wrap_failure_is_key_service_error() {
        let mut kms = MockKeyWrapClient::new();
        kms.expect_wrap()
            .times(1)
            .returning(|_| Err(KeyWrapError::Service("connection refused".into())));
        kms.expect_unwrap().never();
        let enc = EnvelopeEncryptor::new(Arc::new(kms));

        let err = enc.seal_record("u@example.com", &sample()).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::KeyService(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unwrap_integrity_failure_propagates() {
        let mut kms = MockKeyWrapClient::new();
        kms.expect_wrap()
            .returning(|raw| Ok(WrappedDek::new(raw.as_bytes().to_vec())));
        kms.expect_unwrap()
            .returning(|_| Err(KeyWrapError::UnwrapIntegrity("rotated KEK".into())));
        let enc = EnvelopeEncryptor::new(Arc::new(kms));

        let record = enc.seal_record("u@example.com", &sample()).await.unwrap();
        let err = enc.open_record(&record).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::UnwrapIntegrity(_)));
    }

    #[tokio::test]
    async fn tampered_middle_field_aborts_open() {
        let enc = EnvelopeEncryptor::new(Arc::new(identity_kms()));
        let mut record = enc.seal_record("u@example.com", &sample()).await.unwrap();
        let last = record.contact_number.len() - 1;
        record.contact_number[last] ^= 0x80;

        let err = enc.open_record(&record).await.unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Integrity { field: Field::ContactNumber }
        ));
    }

    #[tokio::test]
    async fn truncated_field_is_malformed() {
        let enc = EnvelopeEncryptor::new(Arc::new(identity_kms()));
        let mut record = enc.seal_record("u@example.com", &sample()).await.unwrap();
        record.feedback.truncate(20);

        let err = enc.open_record(&record).await.unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::MalformedEnvelope { field: Field::FeedbackText, len: 20 }
        ));
    }

    #[tokio::test]
    async fn envelope_from_another_record_is_rejected() {
        let enc = EnvelopeEncryptor::new(Arc::new(identity_kms()));
        let mut mine = enc.seal_record("u@example.com", &sample()).await.unwrap();
        let theirs = enc
            .seal_record("other@example.com", &sample())
            .await
            .unwrap();
        mine.email = theirs.email;

        let err = enc.open_record(&mine).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::Integrity { field: Field::Email }));
    }

    #[tokio::test]
    async fn same_identifier_shares_raw_dek() {
        let kms = LocalKeyWrap::new(&[0x5A; dek::KEY_LEN]).unwrap();
        let enc = EnvelopeEncryptor::new(Arc::new(kms));
        let a = enc.seal_record("u@example.com", &sample()).await.unwrap();
        let b = enc
            .seal_record("u@example.com", &PlaintextFeedback::new("x", "y", "z"))
            .await
            .unwrap();

        // Envelopes of one record open under the other's DEK.
        let mut mixed = a.clone();
        mixed.wrapped_dek = b.wrapped_dek.clone();
        assert_eq!(enc.open_record(&mixed).await.unwrap(), sample());
    }

    #[tokio::test]
    async fn concurrent_seal_and_open() {
        let kms = LocalKeyWrap::new(&[0x5A; dek::KEY_LEN]).unwrap();
        let enc = EnvelopeEncryptor::new(Arc::new(kms));

        let mut handles = Vec::new();
        for i in 0..32 {
            let enc = enc.clone();
            handles.push(tokio::spawn(async move {
                let fields = PlaintextFeedback::new(
                    format!("user{i}@example.com"),
                    format!("+1555000{i:04}"),
                    format!("feedback #{i}"),
                );
                let record = enc.seal_record(&fields.email, &fields).await.unwrap();
                assert_eq!(enc.open_record(&record).await.unwrap(), fields);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
