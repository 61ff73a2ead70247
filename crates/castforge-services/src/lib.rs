//! castforge business service layer.
//!
//! Sits between `castforge-db` (repositories) and `castforge-processing` /
//! `castforge-api` (orchestration, facade): the Config Resolver, Template
//! Matcher, Quota Service, Credential Vault, and Storage Path Builder all
//! live here, each a thin, testable wrapper over one or more repositories.

pub mod config_resolver;
pub mod credential_vault;
pub mod quota_service;
pub mod storage_path_builder;
pub mod sync_service;
pub mod template_matcher;

pub use config_resolver::{deep_merge, ConfigResolver};
pub use credential_vault::{CredentialRefresher, CredentialVault, NoRefresher};
pub use quota_service::{QuotaService, ReservationGuard};
pub use storage_path_builder::StoragePathBuilder;
pub use sync_service::{SyncOutcome, SyncService};
pub use template_matcher::TemplateMatcher;
