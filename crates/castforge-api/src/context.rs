//! Wires every repository and service into the one handle every operation
//! function in this crate takes, mirroring the teacher's `AppState`/`Context`
//! bundling pattern (`mindia-services` hands its facade functions a single
//! struct of repositories rather than threading a dozen arguments).

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use castforge_adapters::registry::AdapterRegistry;
use castforge_core::config::Config;
use castforge_db::{
    AutomationJobRepository, AutomationRunRepository, CredentialRepository, OutputPresetRepository,
    OutputTargetRepository, QuotaRepository, RecordingRepository, RunLogRepository, SourceMetadataRepository,
    SourceRepository, TemplateRepository, TenantRepository,
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
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Tracks one cancellation token per in-flight recording run, so `CancelRun`
/// (called from a different task, possibly a different process entry point,
/// than the one running `RunPipeline`) can reach it. Entries are removed as
/// soon as the run they belong to finishes, successfully or not.
#[derive(Clone, Default)]
pub struct RunRegistry {
    tokens: Arc<StdMutex<HashMap<Uuid, CancellationToken>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, recording_id: Uuid) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.lock().unwrap().insert(recording_id, token.clone());
        token
    }

    pub fn remove(&self, recording_id: Uuid) {
        self.tokens.lock().unwrap().remove(&recording_id);
    }

    /// Returns `true` if a run was found and signalled; `false` if nothing is running.
    pub fn cancel(&self, recording_id: Uuid) -> bool {
        match self.tokens.lock().unwrap().get(&recording_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// The single handle every `castforge-api` operation function takes. Cheap
/// to clone (every field is itself a pool-backed repository or an `Arc`).
#[derive(Clone)]
pub struct ApiContext {
    pub tenants: TenantRepository,
    pub sources: SourceRepository,
    pub source_metadata: SourceMetadataRepository,
    pub recordings: RecordingRepository,
    pub templates: TemplateRepository,
    pub output_targets: OutputTargetRepository,
    pub output_presets: OutputPresetRepository,
    pub credentials: CredentialRepository,
    pub automation_jobs: AutomationJobRepository,
    pub automation_runs: AutomationRunRepository,
    pub run_log: RunLogRepository,
    pub config_resolver: ConfigResolver,
    pub template_matcher: TemplateMatcher,
    pub credential_vault: Arc<CredentialVault>,
    pub quota: QuotaService,
    pub sync: SyncService,
    pub adapters: AdapterRegistry,
    pub storage: Arc<dyn Storage>,
    pub executor: Arc<PipelineExecutor>,
    pub runs: RunRegistry,
    pub config: Arc<Config>,
}

impl ApiContext {
    /// Builds every repository from the one pool and wires the services and
    /// the Pipeline Executor on top, exactly once at process startup. Both
    /// `castforge-api` callers (a future HTTP router) and `castforge-worker`
    /// (the scheduler) share this single construction path so a manually
    /// triggered run and an automation-triggered run go through identical
    /// quota/FSM/advisory-lock plumbing (spec §5: "All pipeline entry points
    /// ... go through it").
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
        let source_metadata = SourceMetadataRepository::new(pool.clone());
        let recordings = RecordingRepository::new(pool.clone());
        let templates = TemplateRepository::new(pool.clone());
        let output_targets = OutputTargetRepository::new(pool.clone());
        let output_presets = OutputPresetRepository::new(pool.clone());
        let credentials = CredentialRepository::new(pool.clone());
        let automation_jobs = AutomationJobRepository::new(pool.clone());
        let automation_runs = AutomationRunRepository::new(pool.clone());
        let run_log = RunLogRepository::new(pool.clone());
        let quota = QuotaService::new(QuotaRepository::new(pool.clone()));

        let config_resolver = ConfigResolver::new(tenants.clone(), templates.clone(), recordings.clone());
        let template_matcher = TemplateMatcher::new(templates.clone());
        let sync = SyncService::new(recordings.clone(), source_metadata.clone(), adapters.clone(), credential_vault.clone());
        let fsm = RecordingFsm::new(recordings.clone(), run_log.clone());
        let output_fsm = OutputTargetFsm::new(output_targets.clone(), recordings.clone());

        let executor = Arc::new(PipelineExecutor::new(
            recordings.clone(),
            sources.clone(),
            tenants.clone(),
            output_targets.clone(),
            output_presets.clone(),
            fsm,
            output_fsm,
            config_resolver.clone(),
            credential_vault.clone(),
            quota.clone(),
            adapters.clone(),
            storage.clone(),
            ffmpeg,
            config.clone(),
        ));

        Self {
            tenants,
            sources,
            source_metadata,
            recordings,
            templates,
            output_targets,
            output_presets,
            credentials,
            automation_jobs,
            automation_runs,
            run_log,
            config_resolver,
            template_matcher,
            credential_vault,
            quota,
            sync,
            adapters,
            storage,
            executor,
            runs: RunRegistry::new(),
            config,
        }
    }
}
