use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use envelope::crypto::{open_bytes, CipherError, MIN_ENVELOPE_LEN};
use envelope::dek::{self, RawDek, WrappedDek};
use envelope::kms::LocalKeyWrap;
use envelope::{
    EnvelopeEncryptor, EnvelopeError, Field, KeyWrapClient, KeyWrapError, PlaintextFeedback,
};

/// KMS stub whose wrapped key is the raw key, unchanged.
struct IdentityKms;

#[async_trait]
impl KeyWrapClient for IdentityKms {
    async fn wrap(&self, raw: &RawDek) -> Result<WrappedDek, KeyWrapError> {
        Ok(WrappedDek::new(raw.as_bytes().to_vec()))
    }

    async fn unwrap(&self, wrapped: &WrappedDek) -> Result<RawDek, KeyWrapError> {
        RawDek::from_slice(wrapped.as_bytes())
            .map_err(|e| KeyWrapError::UnwrapIntegrity(e.to_string()))
    }
}

/// KMS stub that is always down, counting how often it was asked.
#[derive(Default)]
struct DownKms {
    calls: AtomicUsize,
}

#[async_trait]
impl KeyWrapClient for DownKms {
    async fn wrap(&self, _raw: &RawDek) -> Result<WrappedDek, KeyWrapError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(KeyWrapError::Service("503 from key vault".into()))
    }

    async fn unwrap(&self, _wrapped: &WrappedDek) -> Result<RawDek, KeyWrapError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(KeyWrapError::Service("503 from key vault".into()))
    }
}

fn sample() -> PlaintextFeedback {
    PlaintextFeedback::new("u@example.com", "+15551234567", "great service")
}

#[tokio::test]
async fn end_to_end_with_identity_kms() {
    let enc = EnvelopeEncryptor::new(Arc::new(IdentityKms));
    let record = enc.seal_record("u@example.com", &sample()).await.unwrap();

    for field in Field::ORDER {
        assert_eq!(
            record.envelope(field).len(),
            MIN_ENVELOPE_LEN + sample().get(field).len(),
            "unexpected envelope length for {field}"
        );
    }
    // The identity stub stores the raw DEK, which must be SHA-256 of the identifier.
    assert_eq!(
        record.wrapped_dek.as_bytes(),
        dek::derive("u@example.com").as_bytes()
    );

    let opened = enc.open_record(&record).await.unwrap();
    assert_eq!(opened.email, "u@example.com");
    assert_eq!(opened.contact_number, "+15551234567");
    assert_eq!(opened.feedback, "great service");
}

#[tokio::test]
async fn each_field_opens_independently_with_the_derived_key() {
    let enc = EnvelopeEncryptor::new(Arc::new(IdentityKms));
    let record = enc.seal_record("u@example.com", &sample()).await.unwrap();
    let key = dek::derive("u@example.com");
    assert_eq!(open_bytes(&record.email, &key).unwrap(), "u@example.com");
    assert!(matches!(
        open_bytes(&record.email, &dek::derive("c@d.com")),
        Err(CipherError::Integrity)
    ));
}

#[tokio::test]
async fn kms_outage_fails_seal_with_key_service_error() {
    let kms = Arc::new(DownKms::default());
    let enc = EnvelopeEncryptor::new(kms.clone());

    let err = enc.seal_record("u@example.com", &sample()).await.unwrap_err();
    assert!(matches!(err, EnvelopeError::KeyService(ref msg) if msg.contains("503")));
    assert_eq!(err.kind(), "key_service");
    assert_eq!(kms.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn record_sealed_under_one_kek_cannot_open_under_another() {
    let sealer = EnvelopeEncryptor::new(Arc::new(LocalKeyWrap::new(&[1u8; 32]).unwrap()));
    let opener = EnvelopeEncryptor::new(Arc::new(LocalKeyWrap::new(&[2u8; 32]).unwrap()));

    let record = sealer.seal_record("u@example.com", &sample()).await.unwrap();
    let err = opener.open_record(&record).await.unwrap_err();
    assert!(matches!(err, EnvelopeError::UnwrapIntegrity(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn empty_identifier_and_fields_round_trip() {
    let enc = EnvelopeEncryptor::new(Arc::new(IdentityKms));
    let empty = PlaintextFeedback::new("", "", "");
    let record = enc.seal_record("", &empty).await.unwrap();
    assert_eq!(record.email.len(), MIN_ENVELOPE_LEN);
    assert_eq!(enc.open_record(&record).await.unwrap(), empty);
}
