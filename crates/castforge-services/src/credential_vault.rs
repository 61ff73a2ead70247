//! Credential Vault (spec §4.2): encrypted storage, decryption on use, and
//! platform-specific refresh.

use std::sync::Arc;

use async_trait::async_trait;
use castforge_core::error::AppError;
use castforge_core::models::credential::{Credential, CredentialMetadata, CredentialPayload, Platform};
use castforge_core::EncryptionService;
use castforge_db::CredentialRepository;
use chrono::Utc;
use uuid::Uuid;

/// Performs the network round-trip to exchange a refresh token for a new
/// access token. Implementations are platform-specific and live outside
/// this crate (spec §4.10's adapters own their own HTTP clients); the vault
/// only knows when a refresh is owed and what to do with the result.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self, platform: Platform, payload: &CredentialPayload) -> Result<CredentialPayload, AppError>;
}

/// A refresher that always fails; used for platforms/tests with no refresh path wired up.
pub struct NoRefresher;

#[async_trait]
impl CredentialRefresher for NoRefresher {
    async fn refresh(&self, _platform: Platform, _payload: &CredentialPayload) -> Result<CredentialPayload, AppError> {
        Err(AppError::AuthExpired("no refresher configured for this platform".into()))
    }
}

#[derive(Clone)]
pub struct CredentialVault {
    repo: CredentialRepository,
    encryption: Arc<EncryptionService>,
    refresher: Arc<dyn CredentialRefresher>,
}

impl CredentialVault {
    pub fn new(repo: CredentialRepository, encryption: Arc<EncryptionService>, refresher: Arc<dyn CredentialRefresher>) -> Self {
        Self {
            repo,
            encryption,
            refresher,
        }
    }

    #[tracing::instrument(skip(self, payload))]
    pub async fn put(
        &self,
        tenant_id: Uuid,
        platform: Platform,
        account_key: &str,
        payload: &CredentialPayload,
        metadata: CredentialMetadata,
    ) -> Result<Uuid, AppError> {
        let plaintext = serde_json::to_string(payload)
            .map_err(|e| AppError::Validation(format!("credential payload is not serializable: {e}")))?;
        let ciphertext = self.encryption.encrypt(&plaintext)?;
        let credential = self.repo.put(tenant_id, platform, account_key, &ciphertext, metadata).await?;
        Ok(credential.id)
    }

    /// Decrypts and, if expired and the platform supports it, transparently
    /// refreshes before returning. A platform that does not support refresh
    /// (or whose refresh fails) surfaces `AuthExpired` to the caller.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<CredentialPayload, AppError> {
        let credential = self.repo.get(tenant_id, id).await?;
        let payload = self.decrypt(&credential)?;

        let payload = if payload.is_expired(Utc::now()) {
            self.refresh_and_persist(tenant_id, &credential, payload).await?
        } else {
            payload
        };

        self.repo.touch_last_used(tenant_id, id).await.ok();
        Ok(payload)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_by_platform(
        &self,
        tenant_id: Uuid,
        platform: Platform,
        account_key: &str,
    ) -> Result<CredentialPayload, AppError> {
        let credential = self.repo.get_by_platform(tenant_id, platform, account_key).await?;
        self.get(tenant_id, credential.id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Credential>, AppError> {
        self.repo.list(tenant_id).await
    }

    /// Looks up which platform a credential is scoped to, without
    /// decrypting its payload — callers that need to pick an adapter
    /// (`AdapterRegistry::source`/`sink`/...) before the payload is needed.
    #[tracing::instrument(skip(self))]
    pub async fn platform_of(&self, tenant_id: Uuid, id: Uuid) -> Result<Platform, AppError> {
        let credential = self.repo.get(tenant_id, id).await?;
        Ok(credential.platform)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.repo.revoke(tenant_id, id).await
    }

    /// Forces a refresh regardless of expiry, e.g. in response to a 401
    /// surfaced by a platform adapter mid-upload.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, tenant_id: Uuid, id: Uuid) -> Result<CredentialPayload, AppError> {
        let credential = self.repo.get(tenant_id, id).await?;
        let payload = self.decrypt(&credential)?;
        self.refresh_and_persist(tenant_id, &credential, payload).await
    }

    async fn refresh_and_persist(
        &self,
        tenant_id: Uuid,
        credential: &Credential,
        payload: CredentialPayload,
    ) -> Result<CredentialPayload, AppError> {
        if !credential.platform.supports_refresh() {
            return Err(AppError::AuthExpired(
                "credential expired and this platform has no refresh path".into(),
            ));
        }
        if payload.refresh_token().is_none() {
            return Err(AppError::AuthExpired("no refresh token on file".into()));
        }

        let refreshed = self.refresher.refresh(credential.platform, &payload).await?;
        let plaintext = serde_json::to_string(&refreshed)
            .map_err(|e| AppError::Validation(format!("refreshed credential is not serializable: {e}")))?;
        let ciphertext = self.encryption.encrypt(&plaintext)?;

        self.repo
            .update_ciphertext(tenant_id, credential.id, &ciphertext, credential.metadata.0.clone())
            .await?;

        Ok(refreshed)
    }

    fn decrypt(&self, credential: &Credential) -> Result<CredentialPayload, AppError> {
        let plaintext = self.encryption.decrypt(&credential.ciphertext)?;
        serde_json::from_str(&plaintext)
            .map_err(|e| AppError::CredentialMalformed(format!("stored credential does not match any known shape: {e}")))
    }
}
