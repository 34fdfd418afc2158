//! Configuration loading and validation for the feedback service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use zeroize::Zeroizing;

use envelope::dek::KEY_LEN;

/// Which key-wrap implementation guards the DEKs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KmsBackend {
    /// AWS KMS `Encrypt` / `Decrypt` against [`Config::kms_key_id`].
    Aws,
    /// In-process AES-256-GCM-SIV KEK from [`Config::local_kek`]. Development only.
    Local,
}

impl KmsBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            KmsBackend::Aws => "aws",
            KmsBackend::Local => "local",
        }
    }
}

/// Where sealed records are persisted, parsed from [`Config::database_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    /// Process-local map. Records are lost on restart.
    Memory,
    /// SQLite database at the given path (`:memory:` for a private in-memory DB).
    Sqlite(String),
}

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Key-wrap backend.
    #[serde(default = "default_kms_backend")]
    pub kms_backend: KmsBackend,

    /// KMS key id or ARN of the KEK. **Required** for the `aws` backend.
    #[serde(default)]
    pub kms_key_id: String,

    /// KMS encryption algorithm used for wrapping.
    #[serde(default = "default_kms_wrap_algorithm")]
    pub kms_wrap_algorithm: String,

    /// Override for the KMS endpoint (VPC endpoint, LocalStack).
    #[serde(default)]
    pub kms_endpoint_url: Option<String>,

    /// Base64 32-byte KEK. **Required** for the `local` backend.
    #[serde(default)]
    pub local_kek: Option<String>,

    /// Upper bound on any single wrap/unwrap call, in milliseconds.
    #[serde(default = "default_kms_timeout_ms")]
    pub kms_timeout_ms: u64,

    /// Record store: `sqlite:///<path>`, `sqlite://` (in-memory SQLite) or `memory`.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Token required on `GET /api/feedback/{id}`. **Required.**
    pub api_token: String,

    /// OTLP endpoint for span export. Logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_kms_backend() -> KmsBackend {
    KmsBackend::Aws
}
fn default_kms_wrap_algorithm() -> String {
    "RSAES_OAEP_SHA_256".into()
}
fn default_kms_timeout_ms() -> u64 {
    5000
}
fn default_database_url() -> String {
    "sqlite:///feedback.db".into()
}
fn default_listen_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Deadline applied to each KMS call.
    pub fn kms_timeout(&self) -> Duration {
        Duration::from_millis(self.kms_timeout_ms)
    }

    /// Decode [`Config::local_kek`].
    ///
    /// # Errors
    ///
    /// Returns an error if the KEK is unset, not base64, or not 32 bytes.
    pub fn local_kek_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        let encoded = self
            .local_kek
            .as_deref()
            .context("LOCAL_KEK is required when KMS_BACKEND=local")?;
        let bytes = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .context("LOCAL_KEK must be standard base64")?,
        );
        if bytes.len() != KEY_LEN {
            anyhow::bail!("LOCAL_KEK must decode to {KEY_LEN} bytes, got {}", bytes.len());
        }
        Ok(bytes)
    }

    /// Parse [`Config::database_url`].
    ///
    /// `sqlite:///feedback.db` is a path relative to the working directory and
    /// `sqlite:////var/lib/feedback.db` an absolute one.
    ///
    /// # Errors
    ///
    /// Returns an error for any other scheme or an empty SQLite path.
    pub fn storage_target(&self) -> Result<StorageTarget> {
        let url = self.database_url.trim();
        if url == "memory" {
            return Ok(StorageTarget::Memory);
        }
        if url == "sqlite://" {
            return Ok(StorageTarget::Sqlite(":memory:".into()));
        }
        match url.strip_prefix("sqlite:///") {
            Some(path) if !path.is_empty() => Ok(StorageTarget::Sqlite(path.to_owned())),
            _ => anyhow::bail!("unsupported DATABASE_URL: {url}"),
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.api_token, "API_TOKEN")?;

        match self.kms_backend {
            KmsBackend::Aws => {
                ensure_non_empty(&self.kms_key_id, "KMS_KEY_ID")?;
                ensure_non_empty(&self.kms_wrap_algorithm, "KMS_WRAP_ALGORITHM")?;
            }
            KmsBackend::Local => {
                self.local_kek_bytes()?;
            }
        }

        self.storage_target()?;

        if self.kms_timeout_ms == 0 {
            anyhow::bail!("KMS_TIMEOUT_MS must be > 0");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("kms_backend", &self.kms_backend)
            .field("kms_key_id", &self.kms_key_id)
            .field("kms_wrap_algorithm", &self.kms_wrap_algorithm)
            .field("kms_endpoint_url", &self.kms_endpoint_url)
            .field("local_kek", &self.local_kek.as_ref().map(|_| "[REDACTED]"))
            .field("kms_timeout_ms", &self.kms_timeout_ms)
            .field("database_url", &self.database_url)
            .field("listen_port", &self.listen_port)
            .field("api_token", &"[REDACTED]")
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
