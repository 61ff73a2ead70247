//! castforge Core Library
//!
//! This crate provides core domain models, error types, configuration, and
//! validation shared across every castforge component: the Tenant Context,
//! the error taxonomy, the config layers, the `EncryptionService` used by
//! the Credential Vault, and the one-file-per-entity data model.

pub mod config;
pub mod constants;
pub mod encryption;
pub mod error;
pub mod hooks;
pub mod models;
pub mod validation;

pub use config::{BaseConfig, Config, PipelineConfig};
pub use encryption::EncryptionService;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{NoOpQuotaObserver, QuotaObserver, QuotaResource, UsageInfo};
pub use models::*;
