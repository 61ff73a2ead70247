use castforge_core::error::AppError;
use castforge_core::models::credential::{Credential, CredentialMetadata, Platform};
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Ciphertext is opaque base64 here; encryption/decryption is the Credential
/// Vault service's job, not this repository's.
#[derive(Clone)]
pub struct CredentialRepository {
    pool: PgPool,
}

impl CredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, ciphertext, metadata), fields(db.table = "credentials", db.operation = "upsert"))]
    pub async fn put(
        &self,
        tenant_id: Uuid,
        platform: Platform,
        account_key: &str,
        ciphertext: &str,
        metadata: CredentialMetadata,
    ) -> Result<Credential, AppError> {
        sqlx::query_as::<Postgres, Credential>(
            r#"
            INSERT INTO credentials (id, tenant_id, platform, account_key, ciphertext, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            ON CONFLICT (tenant_id, platform, account_key)
            DO UPDATE SET ciphertext = EXCLUDED.ciphertext, metadata = EXCLUDED.metadata, updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(platform)
        .bind(account_key)
        .bind(ciphertext)
        .bind(sqlx::types::Json(metadata))
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "credentials", db.operation = "select"))]
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Credential, AppError> {
        sqlx::query_as::<Postgres, Credential>(
            "SELECT * FROM credentials WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("credential not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "credentials", db.operation = "select"))]
    pub async fn get_by_platform(
        &self,
        tenant_id: Uuid,
        platform: Platform,
        account_key: &str,
    ) -> Result<Credential, AppError> {
        sqlx::query_as::<Postgres, Credential>(
            "SELECT * FROM credentials WHERE tenant_id = $1 AND platform = $2 AND account_key = $3",
        )
        .bind(tenant_id)
        .bind(platform)
        .bind(account_key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("credential not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "credentials", db.operation = "select"))]
    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Credential>, AppError> {
        sqlx::query_as::<Postgres, Credential>(
            "SELECT * FROM credentials WHERE tenant_id = $1 ORDER BY platform, account_key",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Refresh path: replaces ciphertext and clears `expires_at`/sets a new one in metadata.
    #[tracing::instrument(skip(self, ciphertext, metadata), fields(db.table = "credentials", db.operation = "update"))]
    pub async fn update_ciphertext(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        ciphertext: &str,
        metadata: CredentialMetadata,
    ) -> Result<Credential, AppError> {
        sqlx::query_as::<Postgres, Credential>(
            "UPDATE credentials SET ciphertext = $3, metadata = $4, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(ciphertext)
        .bind(sqlx::types::Json(metadata))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("credential not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "credentials", db.operation = "update"))]
    pub async fn touch_last_used(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE credentials SET metadata = jsonb_set(metadata, '{last_used_at}', to_jsonb($3::timestamptz)), updated_at = now() WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "credentials", db.operation = "delete"))]
    pub async fn revoke(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM credentials WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("credential not found".into()));
        }
        Ok(())
    }
}
