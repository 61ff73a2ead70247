//! Config Resolver (spec §4.3): merges tenant defaults, template overrides,
//! and a per-recording override into one effective config document.

use castforge_core::error::AppError;
use castforge_db::{RecordingRepository, TemplateRepository, TenantRepository};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Recursively merges `patch` into `base`.
///
/// Maps merge key-by-key. Scalars and arrays are replaced outright (no
/// array concatenation). `null` in `patch` unsets the key entirely rather
/// than writing a JSON null, matching the "explicit erase" rule.
pub fn deep_merge(base: &mut JsonValue, patch: &JsonValue) {
    match (base, patch) {
        (JsonValue::Object(base_map), JsonValue::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                if patch_value.is_null() {
                    base_map.remove(key);
                    continue;
                }
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, patch_value),
                    None => {
                        base_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value.clone();
        }
    }
}

#[derive(Clone)]
pub struct ConfigResolver {
    tenants: TenantRepository,
    templates: TemplateRepository,
    recordings: RecordingRepository,
}

impl ConfigResolver {
    pub fn new(tenants: TenantRepository, templates: TemplateRepository, recordings: RecordingRepository) -> Self {
        Self {
            tenants,
            templates,
            recordings,
        }
    }

    /// Live resolution: reads the tenant default, the bound template's
    /// current overrides, and the recording's override, merging in
    /// ascending precedence. Does not touch `effective_config_snapshot`.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_live(&self, tenant_id: Uuid, recording_id: Uuid) -> Result<JsonValue, AppError> {
        let tenant = self.tenants.get(tenant_id).await?;
        let recording = self.recordings.get(tenant_id, recording_id).await?;

        let mut effective = tenant.default_config.clone();

        if let Some(template_id) = recording.template_id {
            let template = self.templates.get(tenant_id, template_id).await?;
            deep_merge(&mut effective, &template.config_overrides);
        }

        if let Some(recording_override) = &recording.config_override {
            deep_merge(&mut effective, recording_override);
        }

        Ok(effective)
    }

    /// Captures the effective config snapshot the first time a recording
    /// advances past `INITIALIZED` (spec §4.3). Idempotent: a recording
    /// that already has a snapshot keeps it, even if the live resolution
    /// would now differ.
    #[tracing::instrument(skip(self))]
    pub async fn snapshot_if_absent(&self, tenant_id: Uuid, recording_id: Uuid) -> Result<JsonValue, AppError> {
        let recording = self.recordings.get(tenant_id, recording_id).await?;
        if let Some(existing) = recording.effective_config_snapshot {
            return Ok(existing);
        }

        let effective = self.resolve_live(tenant_id, recording_id).await?;
        let updated = self
            .recordings
            .snapshot_config_if_absent(tenant_id, recording_id, effective.clone())
            .await?;
        Ok(updated.effective_config_snapshot.unwrap_or(effective))
    }

    /// `ResetConfig(recording_id)` (spec §4.3): clears the per-recording
    /// override, and the snapshot too if no stage has started yet.
    #[tracing::instrument(skip(self))]
    pub async fn reset_config(&self, tenant_id: Uuid, recording_id: Uuid) -> Result<(), AppError> {
        let recording = self.recordings.get(tenant_id, recording_id).await?;
        self.recordings
            .set_config_override(tenant_id, recording_id, JsonValue::Null)
            .await?;

        if recording.status == castforge_core::models::recording::RecordingStatus::Initialized {
            self.recordings.clear_config_snapshot(tenant_id, recording_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_merge_recursively() {
        let mut base = json!({"processing": {"enable_processing": true, "silence_threshold_db": -35}});
        let patch = json!({"processing": {"silence_threshold_db": -40}});
        deep_merge(&mut base, &patch);
        assert_eq!(
            base,
            json!({"processing": {"enable_processing": true, "silence_threshold_db": -40}})
        );
    }

    #[test]
    fn null_unsets_the_key() {
        let mut base = json!({"metadata": {"title_template": "{record_time}"}});
        let patch = json!({"metadata": {"title_template": null}});
        deep_merge(&mut base, &patch);
        assert_eq!(base, json!({"metadata": {}}));
    }

    #[test]
    fn arrays_are_replaced_not_concatenated() {
        let mut base = json!({"subtitles": {"formats": ["srt", "vtt"]}});
        let patch = json!({"subtitles": {"formats": ["vtt"]}});
        deep_merge(&mut base, &patch);
        assert_eq!(base, json!({"subtitles": {"formats": ["vtt"]}}));
    }

    #[test]
    fn unknown_keys_are_preserved() {
        let mut base = json!({"a": 1, "b": 2});
        let patch = json!({"b": 3, "c": 4});
        deep_merge(&mut base, &patch);
        assert_eq!(base, json!({"a": 1, "b": 3, "c": 4}));
    }
}
