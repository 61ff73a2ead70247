use castforge_core::error::AppError;
use castforge_core::models::source::SourceType;
use castforge_core::models::source_metadata::SourceMetadata;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Not tenant-filtered like its siblings: `source_metadata` is keyed 1:1 on
/// `recording_id`, which is itself only ever looked up after `RecordingRepository::get`
/// has already verified tenant ownership (spec §3 `Source Metadata`).
#[derive(Clone)]
pub struct SourceMetadataRepository {
    pool: PgPool,
}

impl SourceMetadataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "source_metadata", db.operation = "select"))]
    pub async fn get(&self, recording_id: Uuid) -> Result<SourceMetadata, AppError> {
        sqlx::query_as::<Postgres, SourceMetadata>("SELECT * FROM source_metadata WHERE recording_id = $1")
            .bind(recording_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("source metadata not found".into()))
    }

    /// Whether a recording already exists for `(source_type, source_key)`
    /// (spec §3: `SourceMetadata` unique globally on that pair). The Sync
    /// Service uses this to skip candidates it has already ingested rather
    /// than re-creating a duplicate `Recording`.
    #[tracing::instrument(skip(self), fields(db.table = "source_metadata", db.operation = "select"))]
    pub async fn exists_by_source_key(&self, source_type: SourceType, source_key: &str) -> Result<bool, AppError> {
        let row: Option<(bool,)> = sqlx::query_as(
            "SELECT true FROM source_metadata WHERE source_type = $1 AND source_key = $2",
        )
        .bind(source_type)
        .bind(source_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}
