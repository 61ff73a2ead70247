//! castforge data access layer.
//!
//! One repository per entity in the data model (spec §3), every query
//! filtered by `tenant_id` (spec §4.1 invariant 1 — no repository exposes a
//! bare "fetch by id"). Cross-tenant lookups return `AppError::NotFound`,
//! never a permission error, so a tenant cannot probe for another tenant's
//! resources.

pub mod db;

pub use db::domain::{
    AutomationJobRepository, AutomationRunRepository, CredentialRepository, OutputPresetRepository,
    OutputTargetRepository, QuotaRepository, RecordingRepository, RunLogRepository,
    SourceMetadataRepository, SourceRepository, TemplateRepository, TenantRepository,
};
pub use db::transaction::{with_transaction, TransactionGuard};
