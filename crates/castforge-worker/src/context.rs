//! Wires every repository and service the scheduler needs into one handle,
//! mirroring `castforge-api`'s `ApiContext` (spec §5: "All pipeline entry
//! points ... go through it" — a scheduler-triggered run and a manually
//! triggered one share the same `SyncService`/`TemplateMatcher`/
//! `PipelineExecutor` construction).

use std::sync::Arc;

use castforge_adapters::registry::AdapterRegistry;
use castforge_core::config::Config;
use castforge_db::{
    AutomationJobRepository, AutomationRunRepository, OutputPresetRepository, OutputTargetRepository,
    QuotaRepository, RecordingRepository, RunLogRepository, SourceMetadataRepository, SourceRepository,
    TemplateRepository, TenantRepository,
};
use castforge_processing::executor::PipelineExecutor;
use castforge_processing::fsm::RecordingFsm;
use castforge_processing::media::FfmpegRunner;
use castforge_processing::output_fsm::OutputTargetFsm;
use castforge_services::config_resolver::ConfigResolver;
use castforge_services::credential_vault::CredentialVault;
use castforge_services::quota_service::QuotaService;
use castforge_services::sync_service::SyncService;
use castforge_services::template_matcher::TemplateMatcher;
use castforge_storage::Storage;
use sqlx::PgPool;

#[derive(Clone)]
pub struct WorkerContext {
    pub tenants: TenantRepository,
    pub sources: SourceRepository,
    pub recordings: RecordingRepository,
    pub templates: TemplateRepository,
    pub automation_jobs: AutomationJobRepository,
    pub automation_runs: AutomationRunRepository,
    pub template_matcher: TemplateMatcher,
    pub sync: SyncService,
    pub executor: Arc<PipelineExecutor>,
}

impl WorkerContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        adapters: AdapterRegistry,
        storage: Arc<dyn Storage>,
        credential_vault: Arc<CredentialVault>,
        ffmpeg: FfmpegRunner,
        config: Arc<Config>,
    ) -> Self {
        let tenants = TenantRepository::new(pool.clone());
        let sources = SourceRepository::new(pool.clone());
        let recordings = RecordingRepository::new(pool.clone());
        let templates = TemplateRepository::new(pool.clone());
        let output_targets = OutputTargetRepository::new(pool.clone());
        let output_presets = OutputPresetRepository::new(pool.clone());
        let automation_jobs = AutomationJobRepository::new(pool.clone());
        let automation_runs = AutomationRunRepository::new(pool.clone());
        let run_log = RunLogRepository::new(pool.clone());
        let source_metadata = SourceMetadataRepository::new(pool.clone());
        let quota = QuotaService::new(QuotaRepository::new(pool.clone()));

        let config_resolver = ConfigResolver::new(tenants.clone(), templates.clone(), recordings.clone());
        let template_matcher = TemplateMatcher::new(templates.clone());
        let sync = SyncService::new(recordings.clone(), source_metadata, adapters.clone(), credential_vault.clone());
        let fsm = RecordingFsm::new(recordings.clone(), run_log.clone());
        let output_fsm = OutputTargetFsm::new(output_targets.clone(), recordings.clone());

        let executor = Arc::new(PipelineExecutor::new(
            recordings.clone(),
            sources.clone(),
            tenants.clone(),
            output_targets,
            output_presets,
            fsm,
            output_fsm,
            config_resolver,
            credential_vault,
            quota,
            adapters,
            storage,
            ffmpeg,
            config,
        ));

        Self {
            tenants,
            sources,
            recordings,
            templates,
            automation_jobs,
            automation_runs,
            template_matcher,
            sync,
            executor,
        }
    }
}
