//! `feedback-svc` binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP spans).
//! 3. Build the key-wrap client for the configured backend, bounded by the KMS timeout.
//! 4. Compose the [`EnvelopeEncryptor`] and open the record store (`DATABASE_URL`).
//! 5. Build the Axum router and start the HTTP server.

mod aws;
mod config;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use envelope::kms::{KeyWrapClient, LocalKeyWrap, TimeoutKeyWrap};
use envelope::EnvelopeEncryptor;
use tracing::{info, warn};

use crate::config::{Config, KmsBackend, StorageTarget};
use crate::server::middleware::ApiToken;
use crate::server::state::AppState;
use crate::store::{FeedbackRepository, InMemoryFeedbackRepository, SqliteFeedbackRepository};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        kms_backend = cfg.kms_backend.as_str(),
        "feedback-svc starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key-wrap client
    // -----------------------------------------------------------------------
    let kms = build_key_wrap_client(&cfg).await?;

    // -----------------------------------------------------------------------
    // 4. Encryptor and storage
    // -----------------------------------------------------------------------
    let encryptor = EnvelopeEncryptor::new(kms);
    let repository = build_repository(&cfg)?;
    let api_token = ApiToken::new(&cfg.api_token).context("failed to build API token verifier")?;

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(encryptor, repository, api_token, cfg.kms_backend.as_str());
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Open the configured record store.
fn build_repository(cfg: &Config) -> Result<Arc<dyn FeedbackRepository>> {
    let repository: Arc<dyn FeedbackRepository> = match cfg.storage_target()? {
        StorageTarget::Memory => {
            warn!("using in-memory record store; records are lost on restart");
            Arc::new(InMemoryFeedbackRepository::new())
        }
        StorageTarget::Sqlite(path) => Arc::new(
            SqliteFeedbackRepository::open(&path)
                .with_context(|| format!("failed to open SQLite store at {path}"))?,
        ),
    };
    Ok(repository)
}

/// Construct the configured [`KeyWrapClient`], wrapped in the KMS deadline.
async fn build_key_wrap_client(cfg: &Config) -> Result<Arc<dyn KeyWrapClient>> {
    let timeout = cfg.kms_timeout();
    let client: Arc<dyn KeyWrapClient> = match cfg.kms_backend {
        KmsBackend::Aws => {
            let inner = aws::AwsKmsKeyWrap::init(
                &cfg.kms_key_id,
                &cfg.kms_wrap_algorithm,
                cfg.kms_endpoint_url.as_deref(),
            )
            .await
            .context("failed to initialise AWS KMS client")?;
            Arc::new(TimeoutKeyWrap::new(inner, timeout))
        }
        KmsBackend::Local => {
            let kek = cfg.local_kek_bytes()?;
            let inner = LocalKeyWrap::new(&kek).context("failed to initialise local KEK")?;
            warn!("using in-process KEK; not for production data");
            Arc::new(TimeoutKeyWrap::new(inner, timeout))
        }
    };
    Ok(client)
}
