//! One repository module per spec §3 entity.

pub mod automation;
pub mod credential;
pub mod output_preset;
pub mod output_target;
pub mod quota;
pub mod recording;
pub mod run_log;
pub mod source;
pub mod source_metadata;
pub mod template;
pub mod tenant;

pub use automation::{AutomationJobRepository, AutomationRunRepository};
pub use credential::CredentialRepository;
pub use output_preset::OutputPresetRepository;
pub use output_target::OutputTargetRepository;
pub use quota::QuotaRepository;
pub use recording::RecordingRepository;
pub use run_log::RunLogRepository;
pub use source::SourceRepository;
pub use source_metadata::SourceMetadataRepository;
pub use template::TemplateRepository;
pub use tenant::TenantRepository;
