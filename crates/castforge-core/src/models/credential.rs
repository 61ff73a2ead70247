use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform a credential is scoped to (spec §3, §4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "platform", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    SourceProvider,
    HostingProviderA,
    HostingProviderB,
    CloudDrive,
    SpeechService,
    TopicService,
}

impl Platform {
    /// The `AdapterRegistry` lookup key for this platform. Adapters register
    /// themselves under these same strings (`SourceAdapter::platform_id` /
    /// `SinkAdapter::platform_id` / ...), so this is the one place the
    /// mapping from the typed enum to the registry's string keys lives.
    pub fn adapter_id(&self) -> &'static str {
        match self {
            Platform::SourceProvider => "conferencing_cloud",
            Platform::HostingProviderA => "hosting_provider_a",
            Platform::HostingProviderB => "hosting_provider_b",
            Platform::CloudDrive => "cloud_drive",
            Platform::SpeechService => "speech_service",
            Platform::TopicService => "topic_service",
        }
    }

    /// Whether this platform's credential supports an automatic refresh
    /// path (spec §4.2's per-platform shape table).
    pub fn supports_refresh(&self) -> bool {
        matches!(
            self,
            Platform::SourceProvider | Platform::HostingProviderA | Platform::CloudDrive
        )
    }
}

/// Non-secret, indexable credential metadata. The ciphertext itself is
/// opaque bytes and never appears here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CredentialMetadata {
    pub account_id: Option<String>,
    pub description: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Encrypted per-tenant platform credential (spec §3 `Credential`).
///
/// Unique within its tenant on `(platform, account_key)`. Decryption key
/// material is process-wide (`EncryptionService`), never persisted here and
/// never logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Credential {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub platform: Platform,
    pub account_key: String,
    /// Base64-encoded AEAD ciphertext produced by `EncryptionService::encrypt`.
    pub ciphertext: String,
    pub metadata: sqlx::types::Json<CredentialMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The decrypted shape of a credential, detected structurally rather than
/// tagged, per spec §4.2 ("detected by shape").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CredentialPayload {
    OAuthBundle {
        client_id: String,
        client_secret: String,
        access_token: String,
        refresh_token: Option<String>,
        scopes: Vec<String>,
        expires_at: Option<DateTime<Utc>>,
    },
    ServerToServer {
        account_id: String,
        client_id: String,
        client_secret: String,
    },
    LongLivedToken {
        access_token: String,
        user_id: Option<String>,
    },
    ApiKey {
        api_key: String,
    },
}

impl CredentialPayload {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            CredentialPayload::OAuthBundle { expires_at, .. } => {
                expires_at.is_some_and(|exp| exp <= now)
            }
            _ => false,
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            CredentialPayload::OAuthBundle { refresh_token, .. } => refresh_token.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_id_is_stable_per_platform() {
        assert_eq!(Platform::SourceProvider.adapter_id(), "conferencing_cloud");
        assert_eq!(Platform::HostingProviderA.adapter_id(), "hosting_provider_a");
        assert_ne!(Platform::HostingProviderA.adapter_id(), Platform::HostingProviderB.adapter_id());
    }

    #[test]
    fn hosting_b_does_not_support_refresh() {
        assert!(!Platform::HostingProviderB.supports_refresh());
        assert!(Platform::HostingProviderA.supports_refresh());
    }

    #[test]
    fn oauth_bundle_expiry_is_detected() {
        let past = Utc::now() - chrono::Duration::hours(1);
        let payload = CredentialPayload::OAuthBundle {
            client_id: "c".into(),
            client_secret: "s".into(),
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            scopes: vec![],
            expires_at: Some(past),
        };
        assert!(payload.is_expired(Utc::now()));
        assert_eq!(payload.refresh_token(), Some("r"));
    }

    #[test]
    fn api_key_never_expires() {
        let payload = CredentialPayload::ApiKey {
            api_key: "k".into(),
        };
        assert!(!payload.is_expired(Utc::now()));
        assert_eq!(payload.refresh_token(), None);
    }
}
