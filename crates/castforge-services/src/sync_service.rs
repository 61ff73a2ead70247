//! Sync Service (spec §4.9 step 2, §6 `RunSync`): pulls candidate
//! recordings from a Source's adapter and materializes them as `Recording`
//! rows. Shared by the on-demand `RunSync` API operation and the
//! Scheduler's per-tick automation run, so a manual sync and an
//! automation-triggered one insert recordings the same way.

use std::sync::Arc;

use castforge_adapters::registry::AdapterRegistry;
use castforge_core::constants::{SYNC_MIN_DURATION_SECONDS_FOR_FULL_PIPELINE, SYNC_MIN_SIZE_BYTES_FOR_FULL_PIPELINE};
use castforge_core::error::AppError;
use castforge_core::models::recording::Recording;
use castforge_core::models::source::Source;
use castforge_db::{RecordingRepository, SourceMetadataRepository};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::credential_vault::CredentialVault;

#[derive(Clone)]
pub struct SyncService {
    recordings: RecordingRepository,
    source_metadata: SourceMetadataRepository,
    adapters: AdapterRegistry,
    credential_vault: Arc<CredentialVault>,
}

/// A candidate the source adapter listed but which was already ingested
/// (by source_key) and therefore was not inserted again.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOutcome {
    pub inserted: u32,
    pub skipped_duplicate: u32,
    pub blank: u32,
}

impl SyncService {
    pub fn new(
        recordings: RecordingRepository,
        source_metadata: SourceMetadataRepository,
        adapters: AdapterRegistry,
        credential_vault: Arc<CredentialVault>,
    ) -> Self {
        Self {
            recordings,
            source_metadata,
            adapters,
            credential_vault,
        }
    }

    /// Runs `Sync(tenant, source, from, to)`: lists candidates from the
    /// source's adapter, skips any whose `source_key` is already attached
    /// to a recording created from this source in the window, and inserts
    /// the rest — short ones as `blank_record = true` (skip the pipeline
    /// entirely), the rest ready to run (spec §4.9 step 2).
    #[tracing::instrument(skip(self, source))]
    pub async fn sync(
        &self,
        tenant_id: Uuid,
        source: &Source,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(Vec<Recording>, SyncOutcome), AppError> {
        let adapter = self
            .adapters
            .source(source.source_type.adapter_id())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let credential_payload = match source.credential_id {
            Some(id) => serde_json::to_value(self.credential_vault.get(tenant_id, id).await?)?,
            None => JsonValue::Object(Default::default()),
        };

        let candidates = adapter
            .list(&credential_payload, &source.settings, from, to)
            .await
            .map_err(|e| AppError::Transient(e.to_string()))?;

        let mut outcome = SyncOutcome::default();
        let mut created = Vec::new();

        for candidate in candidates {
            if self
                .source_metadata
                .exists_by_source_key(source.source_type, &candidate.source_key)
                .await?
            {
                outcome.skipped_duplicate += 1;
                continue;
            }

            let blank = candidate.duration_seconds < SYNC_MIN_DURATION_SECONDS_FOR_FULL_PIPELINE
                || candidate.size_bytes < SYNC_MIN_SIZE_BYTES_FOR_FULL_PIPELINE;

            let recording = self
                .recordings
                .create(
                    tenant_id,
                    source.id,
                    &candidate.display_name,
                    candidate.start_time,
                    candidate.duration_seconds,
                    candidate.size_bytes,
                    blank,
                    &candidate.source_key,
                    candidate.raw_payload,
                )
                .await?;

            if blank {
                outcome.blank += 1;
            } else {
                outcome.inserted += 1;
            }
            created.push(recording);
        }

        Ok((created, outcome))
    }
}
