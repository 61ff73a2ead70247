//! Error types module
//!
//! All fallible core operations return `Result<T, AppError>`. `AppError`
//! self-describes its HTTP-facing characteristics through the
//! `ErrorMetadata` trait so an (out-of-scope) HTTP layer can render a
//! response without the core knowing about HTTP.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like quota limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// The error taxonomy the pipeline and services share. There is no `Failed`
/// variant: stage failures surface as `Transient` (retryable by the stage
/// runner) or `StagePermanent` (not), and the Recording FSM rolls the
/// recording's status back to its last completed stage instead of parking it
/// in a terminal failure state.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Entity missing, or a cross-tenant access attempt. The two are never
    /// distinguished at this layer so a tenant cannot probe for the
    /// existence of another tenant's resources.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate key, or a second pipeline invocation racing an existing one.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input: template placeholder syntax, matching rule regex,
    /// config shape.
    #[error("validation error: {0}")]
    Validation(String),

    /// Tenant context lacks the permission flag the operation requires.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A per-tenant quota (concurrent slots, monthly recordings, storage
    /// bytes) would be exceeded by this operation.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Credential needs refresh/re-auth and no refresh path exists, or the
    /// refresh attempt itself failed.
    #[error("credential expired: {0}")]
    AuthExpired(String),

    /// Credential was explicitly revoked by the platform.
    #[error("credential revoked: {0}")]
    AuthRevoked(String),

    /// Decrypted credential does not match the shape the platform adapter expects.
    #[error("malformed credential: {0}")]
    CredentialMalformed(String),

    /// AEAD decryption failed (wrong key version, corrupted ciphertext).
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Network/timeout/5xx from an external collaborator; the stage runner
    /// retries these up to the configured bound.
    #[error("transient error: {0}")]
    Transient(String),

    /// Non-retryable stage failure (corrupted source file, permanent
    /// provider rejection). Sets `failed=true` and rolls the recording back.
    #[error("stage failed permanently: {0}")]
    StagePermanent(String),

    /// Cooperative cancellation requested mid-stage. Never retried.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A pipeline run was requested for a recording that already has one in
    /// flight.
    #[error("already running: {0}")]
    AlreadyRunning(String),

    /// Invariant violation or unexpected failure; logged in full, surfaced
    /// to clients as an opaque 500.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("internal error")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("io error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("json error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("uuid parse error: {}", err))
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Validation(format!("invalid regex: {}", err))
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::InternalWithSource {
                message: "database error".to_string(),
                source: other.into(),
            },
        }
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Validation(_) => "Validation",
            AppError::PermissionDenied(_) => "PermissionDenied",
            AppError::QuotaExceeded(_) => "QuotaExceeded",
            AppError::AuthExpired(_) => "AuthExpired",
            AppError::AuthRevoked(_) => "AuthRevoked",
            AppError::CredentialMalformed(_) => "CredentialMalformed",
            AppError::DecryptionFailed(_) => "DecryptionFailed",
            AppError::Transient(_) => "Transient",
            AppError::StagePermanent(_) => "StagePermanent",
            AppError::Cancelled(_) => "Cancelled",
            AppError::AlreadyRunning(_) => "AlreadyRunning",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Whether a stage runner should retry this error automatically. Only
    /// `Transient` is retried; everything else either isn't a stage error or
    /// is permanent by construction.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }

    /// Get detailed error information including the error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  caused by: {}", err));
            source = err.source();
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::Validation(_) => 400,
            AppError::PermissionDenied(_) => 403,
            AppError::QuotaExceeded(_) => 429,
            AppError::AuthExpired(_) | AppError::AuthRevoked(_) => 401,
            AppError::CredentialMalformed(_) => 400,
            AppError::DecryptionFailed(_) => 500,
            AppError::Transient(_) => 502,
            AppError::StagePermanent(_) => 422,
            AppError::Cancelled(_) => 499,
            AppError::AlreadyRunning(_) => 409,
            AppError::Internal(_) => 500,
            AppError::InternalWithSource { .. } => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            AppError::AuthExpired(_) => "AUTH_EXPIRED",
            AppError::AuthRevoked(_) => "AUTH_REVOKED",
            AppError::CredentialMalformed(_) => "CREDENTIAL_MALFORMED",
            AppError::DecryptionFailed(_) => "DECRYPTION_FAILED",
            AppError::Transient(_) => "TRANSIENT",
            AppError::StagePermanent(_) => "STAGE_PERMANENT",
            AppError::Cancelled(_) => "CANCELLED",
            AppError::AlreadyRunning(_) => "ALREADY_RUNNING",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::InternalWithSource { .. } => "INTERNAL_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Transient(_)
                | AppError::QuotaExceeded(_)
                | AppError::AlreadyRunning(_)
                | AppError::Internal(_)
                | AppError::InternalWithSource { .. }
        )
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::NotFound(_) => Some("Verify the resource id and tenant"),
            AppError::Conflict(_) => Some("Refresh state and retry"),
            AppError::Validation(_) => Some("Check request parameters and try again"),
            AppError::PermissionDenied(_) => Some("Check the tenant's permission flags"),
            AppError::QuotaExceeded(_) => Some("Wait for a slot to free up or raise the limit"),
            AppError::AuthExpired(_) => Some("Re-authorize the credential"),
            AppError::AuthRevoked(_) => Some("Re-authorize the credential"),
            AppError::CredentialMalformed(_) => Some("Re-enter the credential"),
            AppError::DecryptionFailed(_) => Some("Contact support"),
            AppError::Transient(_) => Some("Retry after a short delay"),
            AppError::StagePermanent(_) => Some("Inspect failed_reason; manual retry required"),
            AppError::Cancelled(_) => None,
            AppError::AlreadyRunning(_) => Some("Wait for the current run to finish"),
            AppError::Internal(_) => Some("Retry after a short delay"),
            AppError::InternalWithSource { .. } => Some("Retry after a short delay"),
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::NotFound(m) => m.clone(),
            AppError::Conflict(m) => m.clone(),
            AppError::Validation(m) => m.clone(),
            AppError::PermissionDenied(m) => m.clone(),
            AppError::QuotaExceeded(m) => m.clone(),
            AppError::AuthExpired(m) => m.clone(),
            AppError::AuthRevoked(m) => m.clone(),
            AppError::CredentialMalformed(m) => m.clone(),
            AppError::DecryptionFailed(_) => "failed to decrypt credential".to_string(),
            AppError::Transient(m) => m.clone(),
            AppError::StagePermanent(m) => m.clone(),
            AppError::Cancelled(m) => m.clone(),
            AppError::AlreadyRunning(m) => m.clone(),
            AppError::Internal(_) => "internal server error".to_string(),
            AppError::InternalWithSource { .. } => "internal server error".to_string(),
        }
    }

    fn is_sensitive(&self) -> bool {
        matches!(
            self,
            AppError::DecryptionFailed(_) | AppError::Internal(_) | AppError::InternalWithSource { .. }
        )
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::NotFound(_)
            | AppError::Validation(_)
            | AppError::PermissionDenied(_)
            | AppError::Cancelled(_) => LogLevel::Debug,
            AppError::Conflict(_)
            | AppError::QuotaExceeded(_)
            | AppError::AuthExpired(_)
            | AppError::AuthRevoked(_)
            | AppError::CredentialMalformed(_)
            | AppError::Transient(_)
            | AppError::StagePermanent(_)
            | AppError::AlreadyRunning(_) => LogLevel::Warn,
            AppError::DecryptionFailed(_) | AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                LogLevel::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_metadata() {
        let err = AppError::NotFound("recording 1 not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn transient_is_recoverable_and_marked_transient() {
        let err = AppError::Transient("speech api 503".to_string());
        assert!(err.is_recoverable());
        assert!(err.is_transient());
        assert_eq!(err.http_status_code(), 502);
    }

    #[test]
    fn stage_permanent_is_not_transient() {
        let err = AppError::StagePermanent("corrupted video".to_string());
        assert!(!err.is_transient());
        assert_eq!(err.error_code(), "STAGE_PERMANENT");
    }

    #[test]
    fn quota_exceeded_maps_to_429() {
        let err = AppError::QuotaExceeded("max_concurrent_processes reached".to_string());
        assert_eq!(err.http_status_code(), 429);
        assert!(err.is_recoverable());
    }

    #[test]
    fn internal_with_source_is_sensitive() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert!(err.is_sensitive());
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn suggested_actions_are_specific() {
        let err = AppError::AuthExpired("youtube token".to_string());
        assert_eq!(err.suggested_action(), Some("Re-authorize the credential"));
    }
}
