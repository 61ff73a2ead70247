use castforge_core::error::AppError;
use castforge_core::models::recording::{PipelineStage, Recording, RecordingStatus};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Optional filters for `ListRecordings` (spec §6: "Filter shape for lists").
/// `tenant_id` is implicit (the repository's first argument), never a field here.
#[derive(Debug, Clone, Default)]
pub struct RecordingFilter {
    pub source_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    /// Matches if the recording's status is any of these; `None`/empty means no status filter.
    pub status: Option<Vec<RecordingStatus>>,
    pub failed: Option<bool>,
    pub blank_record: Option<bool>,
    pub is_mapped: Option<bool>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    /// Case-insensitive substring match against `display_name`.
    pub display_name_contains: Option<String>,
}

#[derive(Clone)]
pub struct RecordingRepository {
    pool: PgPool,
}

impl RecordingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, raw_payload), fields(db.table = "recordings", db.operation = "insert"))]
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        tenant_id: Uuid,
        source_id: Uuid,
        display_name: &str,
        start_time: DateTime<Utc>,
        duration_seconds: i64,
        size_bytes: i64,
        blank_record: bool,
        source_key: &str,
        raw_payload: JsonValue,
    ) -> Result<Recording, AppError> {
        let status = if blank_record {
            RecordingStatus::Skipped
        } else {
            RecordingStatus::Initialized
        };

        let mut tx = self.pool.begin().await?;

        let recording = sqlx::query_as::<Postgres, Recording>(
            r#"
            INSERT INTO recordings (
                id, tenant_id, source_id, template_id, is_mapped, display_name, start_time,
                duration_seconds, size_bytes, status, failed, failed_at_stage, failed_reason,
                failed_at, retry_count, blank_record, source_file_path, processed_video_path,
                processed_audio_path, transcription_dir_path, transcription_info, topics,
                active_topics_version, effective_config_snapshot, config_override, expire_at,
                created_at, updated_at
            )
            VALUES (
                $1, $2, $3, NULL, false, $4, $5, $6, $7, $8, false, NULL, NULL, NULL, 0, $9,
                NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, now(), now()
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(source_id)
        .bind(display_name)
        .bind(start_time)
        .bind(duration_seconds)
        .bind(size_bytes)
        .bind(status)
        .bind(blank_record)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO source_metadata (recording_id, source_type, source_key, raw_payload, fetched_at)
             SELECT $1, source_type, $2, $3, now() FROM sources WHERE id = $4",
        )
        .bind(recording.id)
        .bind(source_key)
        .bind(raw_payload)
        .bind(source_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(recording)
    }

    #[tracing::instrument(skip(self), fields(db.table = "recordings", db.operation = "select"))]
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Recording, AppError> {
        sqlx::query_as::<Postgres, Recording>("SELECT * FROM recordings WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    #[tracing::instrument(skip(self, filter), fields(db.table = "recordings", db.operation = "select"))]
    pub async fn list(&self, tenant_id: Uuid, filter: &RecordingFilter) -> Result<Vec<Recording>, AppError> {
        let display_name_pattern = filter.display_name_contains.as_ref().map(|s| format!("%{s}%"));
        sqlx::query_as::<Postgres, Recording>(
            r#"
            SELECT * FROM recordings
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR source_id = $2)
              AND ($3::uuid IS NULL OR template_id = $3)
              AND ($4::recording_status[] IS NULL OR status = ANY($4))
              AND ($5::bool IS NULL OR failed = $5)
              AND ($6::bool IS NULL OR blank_record = $6)
              AND ($7::bool IS NULL OR is_mapped = $7)
              AND ($8::timestamptz IS NULL OR start_time >= $8)
              AND ($9::timestamptz IS NULL OR start_time <= $9)
              AND ($10::text IS NULL OR display_name ILIKE $10)
            ORDER BY start_time DESC
            "#,
        )
        .bind(tenant_id)
        .bind(filter.source_id)
        .bind(filter.template_id)
        .bind(filter.status.clone())
        .bind(filter.failed)
        .bind(filter.blank_record)
        .bind(filter.is_mapped)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(display_name_pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Recordings not yet bound to a template, candidates for the Template Matcher.
    #[tracing::instrument(skip(self), fields(db.table = "recordings", db.operation = "select"))]
    pub async fn list_unmapped(&self, tenant_id: Uuid) -> Result<Vec<Recording>, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            "SELECT * FROM recordings WHERE tenant_id = $1 AND is_mapped = false AND blank_record = false ORDER BY start_time",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn bind_template(&self, tenant_id: Uuid, id: Uuid, template_id: Uuid) -> Result<Recording, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            "UPDATE recordings SET template_id = $3, is_mapped = true, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    #[tracing::instrument(skip(self, override_doc), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn set_config_override(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        override_doc: JsonValue,
    ) -> Result<Recording, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            "UPDATE recordings SET config_override = $3, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(override_doc)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    /// Freezes the effective config the first time a recording advances past
    /// `INITIALIZED` (spec §4.3). No-op (keeps existing snapshot) if already set.
    #[tracing::instrument(skip(self, snapshot), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn snapshot_config_if_absent(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        snapshot: JsonValue,
    ) -> Result<Recording, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            r#"
            UPDATE recordings
            SET effective_config_snapshot = COALESCE(effective_config_snapshot, $3), updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(snapshot)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    /// `ResetConfig` (spec §4.3): unconditionally clears a previously
    /// captured snapshot. Distinct from `snapshot_config_if_absent`, whose
    /// `COALESCE` can never null out an existing value.
    #[tracing::instrument(skip(self), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn clear_config_snapshot(&self, tenant_id: Uuid, id: Uuid) -> Result<Recording, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            "UPDATE recordings SET effective_config_snapshot = NULL, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: RecordingStatus,
    ) -> Result<Recording, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            "UPDATE recordings SET status = $3, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    /// Applies the rollback-plus-flag failure model in one statement (spec §4.5).
    #[tracing::instrument(skip(self, reason), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn apply_stage_failure(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        rollback_status: RecordingStatus,
        stage: PipelineStage,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Recording, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            r#"
            UPDATE recordings
            SET status = $3, failed = true, failed_at_stage = $4, failed_reason = $5, failed_at = $6, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(rollback_status)
        .bind(stage)
        .bind(reason)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn begin_retry(&self, tenant_id: Uuid, id: Uuid) -> Result<Recording, AppError> {
        let recording = self.get(tenant_id, id).await?;
        if !recording.can_retry() {
            return Err(AppError::Conflict("recording is not retryable".into()));
        }
        sqlx::query_as::<Postgres, Recording>(
            r#"
            UPDATE recordings
            SET failed = false, failed_reason = NULL, failed_at = NULL, retry_count = retry_count + 1, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn reset_retry_budget(&self, tenant_id: Uuid, id: Uuid) -> Result<Recording, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            "UPDATE recordings SET retry_count = 0, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    #[tracing::instrument(skip(self, field, value), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn set_artifact_path(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        field: ArtifactField,
        value: &str,
    ) -> Result<Recording, AppError> {
        let column = field.column();
        let query = format!(
            "UPDATE recordings SET {column} = $3, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *"
        );
        sqlx::query_as::<Postgres, Recording>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    #[tracing::instrument(skip(self, transcription_info), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn set_transcription_info(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        transcription_info: JsonValue,
    ) -> Result<Recording, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            "UPDATE recordings SET transcription_info = $3, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(transcription_info)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    #[tracing::instrument(skip(self, topics), fields(db.table = "recordings", db.operation = "update"))]
    pub async fn set_topics(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        topics: JsonValue,
        version: i32,
    ) -> Result<Recording, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            r#"
            UPDATE recordings
            SET topics = $3, active_topics_version = $4, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(topics)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("recording not found".into()))
    }

    /// Every recording whose `expire_at` has passed and which has not
    /// already been swept, across all tenants — the expiry sweep's
    /// candidate set (spec §3 Lifecycle, §4.11).
    #[tracing::instrument(skip(self), fields(db.table = "recordings", db.operation = "select"))]
    pub async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Recording>, AppError> {
        sqlx::query_as::<Postgres, Recording>(
            "SELECT * FROM recordings WHERE expire_at IS NOT NULL AND expire_at <= $1 AND status != $2",
        )
        .bind(now)
        .bind(RecordingStatus::Expired)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Deletion cascades to output targets and source metadata at the
    /// database level (`ON DELETE CASCADE`); the caller is responsible for
    /// the storage `rmtree` and the matching `TrackStorageRemoved` call.
    #[tracing::instrument(skip(self), fields(db.table = "recordings", db.operation = "delete"))]
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM recordings WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("recording not found".into()));
        }
        Ok(())
    }
}

/// Columns that stage runners write one-at-a-time as artifacts land.
#[derive(Debug, Clone, Copy)]
pub enum ArtifactField {
    SourceFilePath,
    ProcessedVideoPath,
    ProcessedAudioPath,
    TranscriptionDirPath,
}

impl ArtifactField {
    fn column(self) -> &'static str {
        match self {
            ArtifactField::SourceFilePath => "source_file_path",
            ArtifactField::ProcessedVideoPath => "processed_video_path",
            ArtifactField::ProcessedAudioPath => "processed_audio_path",
            ArtifactField::TranscriptionDirPath => "transcription_dir_path",
        }
    }
}
