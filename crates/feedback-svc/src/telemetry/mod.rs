//! Tracing setup: structured JSON logs, plus optional OTLP span export.
//!
//! # Telemetry invariants
//!
//! - **No PII or key material** must appear in any span attribute or log field.
//!   Seal/open spans carry only an operation id, a record id, and error kinds.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
