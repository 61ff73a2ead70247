use castforge_core::error::AppError;
use castforge_core::models::credential::Platform;
use castforge_core::models::output_preset::OutputPreset;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(Clone)]
pub struct OutputPresetRepository {
    pool: PgPool,
}

impl OutputPresetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, default_metadata), fields(db.table = "output_presets", db.operation = "insert"))]
    pub async fn create(
        &self,
        tenant_id: Uuid,
        name: &str,
        target_platform: Platform,
        credential_id: Uuid,
        default_metadata: JsonValue,
    ) -> Result<OutputPreset, AppError> {
        sqlx::query_as::<Postgres, OutputPreset>(
            r#"
            INSERT INTO output_presets (id, tenant_id, name, target_platform, credential_id, default_metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(name)
        .bind(target_platform)
        .bind(credential_id)
        .bind(default_metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "output_presets", db.operation = "select"))]
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<OutputPreset, AppError> {
        sqlx::query_as::<Postgres, OutputPreset>(
            "SELECT * FROM output_presets WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("output preset not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "output_presets", db.operation = "select"))]
    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<OutputPreset>, AppError> {
        sqlx::query_as::<Postgres, OutputPreset>(
            "SELECT * FROM output_presets WHERE tenant_id = $1 ORDER BY name",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, default_metadata), fields(db.table = "output_presets", db.operation = "update"))]
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        credential_id: Uuid,
        default_metadata: JsonValue,
    ) -> Result<OutputPreset, AppError> {
        sqlx::query_as::<Postgres, OutputPreset>(
            "UPDATE output_presets SET credential_id = $3, default_metadata = $4, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(credential_id)
        .bind(default_metadata)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("output preset not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "output_presets", db.operation = "delete"))]
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM output_presets WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("output preset not found".into()));
        }
        Ok(())
    }
}
