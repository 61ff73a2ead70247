//! Credential operations (spec §6): `PutCredential`, `RevokeCredential`.

use castforge_core::error::AppError;
use castforge_core::models::credential::{Credential, CredentialMetadata, CredentialPayload, Platform};
use castforge_core::models::tenant::TenantContext;
use uuid::Uuid;

use crate::context::ApiContext;
use crate::permissions;

/// Encrypts and stores a new credential, or rotates the payload of an
/// existing one under the same `(platform, account_key)` identity.
pub async fn put_credential(
    ctx: &ApiContext,
    tenant_ctx: &TenantContext,
    platform: Platform,
    account_key: &str,
    payload: &CredentialPayload,
    metadata: CredentialMetadata,
) -> Result<Uuid, AppError> {
    permissions::require(tenant_ctx, |p| p.can_manage_credentials, "PutCredential")?;
    ctx.credential_vault.put(tenant_ctx.tenant_id, platform, account_key, payload, metadata).await
}

pub async fn list_credentials(ctx: &ApiContext, tenant_ctx: &TenantContext) -> Result<Vec<Credential>, AppError> {
    ctx.credential_vault.list(tenant_ctx.tenant_id).await
}

pub async fn get_credential_by_platform(
    ctx: &ApiContext,
    tenant_ctx: &TenantContext,
    platform: Platform,
    account_key: &str,
) -> Result<CredentialPayload, AppError> {
    ctx.credential_vault.get_by_platform(tenant_ctx.tenant_id, platform, account_key).await
}

/// Forces a refresh ahead of expiry, e.g. an admin-triggered "reconnect
/// account" action (spec §4.2).
pub async fn refresh_credential(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<CredentialPayload, AppError> {
    permissions::require(tenant_ctx, |p| p.can_manage_credentials, "RefreshCredential")?;
    ctx.credential_vault.refresh(tenant_ctx.tenant_id, id).await
}

pub async fn revoke_credential(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
    permissions::require(tenant_ctx, |p| p.can_manage_credentials, "RevokeCredential")?;
    ctx.credential_vault.delete(tenant_ctx.tenant_id, id).await
}
