//! [`AwsKmsKeyWrap`]: wraps and unwraps DEKs with AWS KMS `Encrypt` / `Decrypt`.

use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kms::{
    error::{DisplayErrorContext, SdkError},
    operation::decrypt::DecryptError,
    primitives::Blob,
    types::EncryptionAlgorithmSpec,
};
use tracing::info;
use zeroize::Zeroizing;

use envelope::dek::{RawDek, WrappedDek};
use envelope::kms::{KeyWrapClient, KeyWrapError};

/// KMS client bound to a single KEK and wrapping algorithm.
///
/// The underlying SDK client is connection-pooled and safe to share across
/// concurrent requests.
#[derive(Clone, Debug)]
pub struct AwsKmsKeyWrap {
    client: aws_sdk_kms::Client,
    key_id: String,
    algorithm: EncryptionAlgorithmSpec,
}

impl AwsKmsKeyWrap {
    /// Load the shared AWS config and build a KMS client for `key_id`.
    ///
    /// `algorithm` is a KMS `EncryptionAlgorithmSpec` name such as
    /// `RSAES_OAEP_SHA_256` (asymmetric KEK) or `SYMMETRIC_DEFAULT`.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm name is not one KMS knows.
    pub async fn init(key_id: &str, algorithm: &str, endpoint_url: Option<&str>) -> Result<Self> {
        if !EncryptionAlgorithmSpec::values().contains(&algorithm) {
            anyhow::bail!("unsupported KMS_WRAP_ALGORITHM: {algorithm}");
        }
        let algorithm = EncryptionAlgorithmSpec::from(algorithm);

        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mut builder = aws_sdk_kms::config::Builder::from(&config);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url);
        }
        let client = aws_sdk_kms::Client::from_conf(builder.build());

        info!(algorithm = algorithm.as_str(), "AWS KMS key-wrap client initialised");
        Ok(Self {
            client,
            key_id: key_id.to_owned(),
            algorithm,
        })
    }
}

#[async_trait]
impl KeyWrapClient for AwsKmsKeyWrap {
    async fn wrap(&self, raw: &RawDek) -> Result<WrappedDek, KeyWrapError> {
        let resp = self
            .client
            .encrypt()
            .key_id(&self.key_id)
            .encryption_algorithm(self.algorithm.clone())
            .plaintext(Blob::new(raw.as_bytes().to_vec()))
            .send()
            .await
            .map_err(|e| KeyWrapError::Service(DisplayErrorContext(&e).to_string()))?;

        let blob = resp
            .ciphertext_blob()
            .ok_or_else(|| KeyWrapError::Service("KMS encrypt response contained no ciphertext".into()))?;
        Ok(WrappedDek::new(blob.as_ref().to_vec()))
    }

    async fn unwrap(&self, wrapped: &WrappedDek) -> Result<RawDek, KeyWrapError> {
        let resp = self
            .client
            .decrypt()
            .key_id(&self.key_id)
            .encryption_algorithm(self.algorithm.clone())
            .ciphertext_blob(Blob::new(wrapped.as_bytes().to_vec()))
            .send()
            .await
            .map_err(decrypt_failure)?;

        let plaintext = resp
            .plaintext()
            .ok_or_else(|| KeyWrapError::Service("KMS decrypt response contained no plaintext".into()))?;
        let plaintext = Zeroizing::new(plaintext.as_ref().to_vec());

        RawDek::from_slice(&plaintext).map_err(|e| KeyWrapError::UnwrapIntegrity(e.to_string()))
    }
}

fn decrypt_failure(err: SdkError<DecryptError>) -> KeyWrapError {
    let detail = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(e) if is_integrity_failure(e) => KeyWrapError::UnwrapIntegrity(detail),
        _ => KeyWrapError::Service(detail),
    }
}

/// KMS rejected the ciphertext itself rather than the request.
fn is_integrity_failure(err: &DecryptError) -> bool {
    err.is_invalid_ciphertext_exception() || err.is_incorrect_key_exception()
}
