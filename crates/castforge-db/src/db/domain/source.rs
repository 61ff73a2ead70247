use castforge_core::error::AppError;
use castforge_core::models::source::{Source, SourceType};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(Clone)]
pub struct SourceRepository {
    pool: PgPool,
}

impl SourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, settings), fields(db.table = "sources", db.operation = "insert"))]
    pub async fn create(
        &self,
        tenant_id: Uuid,
        source_type: SourceType,
        name: &str,
        credential_id: Option<Uuid>,
        settings: JsonValue,
        sync_days: i32,
    ) -> Result<Source, AppError> {
        sqlx::query_as::<Postgres, Source>(
            r#"
            INSERT INTO sources (id, tenant_id, source_type, name, credential_id, settings, sync_days, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(source_type)
        .bind(name)
        .bind(credential_id)
        .bind(settings)
        .bind(sync_days)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "sources", db.operation = "select"))]
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Source, AppError> {
        sqlx::query_as::<Postgres, Source>("SELECT * FROM sources WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("source not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "sources", db.operation = "select"))]
    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Source>, AppError> {
        sqlx::query_as::<Postgres, Source>("SELECT * FROM sources WHERE tenant_id = $1 ORDER BY name")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, settings), fields(db.table = "sources", db.operation = "update"))]
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: &str,
        settings: JsonValue,
        sync_days: i32,
    ) -> Result<Source, AppError> {
        sqlx::query_as::<Postgres, Source>(
            "UPDATE sources SET name = $3, settings = $4, sync_days = $5, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(name)
        .bind(settings)
        .bind(sync_days)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("source not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "sources", db.operation = "delete"))]
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM sources WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("source not found".into()));
        }
        Ok(())
    }
}
