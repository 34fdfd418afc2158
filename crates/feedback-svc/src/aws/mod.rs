//! AWS KMS implementation of the key-wrap boundary.
//!
//! Credentials are resolved through the standard AWS credential chain
//! (environment, profile, instance or task role). The endpoint can be
//! overridden for VPC endpoints or local emulators.

pub mod kms;

pub use kms::AwsKmsKeyWrap;
