//! Stage runners implementing the per-stage contracts of spec §4.7. Each
//! module is pure business logic — adapter calls, ffmpeg invocations, shape
//! rules — and returns either the stage's artifacts or an `AppError`. The
//! Pipeline Executor (`crate::executor`) owns FSM transitions, retries, and
//! concurrency gating around these calls.

pub mod download;
pub mod extract_topics;
pub mod generate_subtitles;
pub mod transcribe;
pub mod trim;
pub mod upload;

use castforge_core::error::AppError;
use std::future::Future;
use std::time::Duration;

/// In-stage transient retry loop (spec §7): up to
/// `STAGE_TRANSIENT_MAX_ATTEMPTS` attempts, exponential backoff starting at
/// `STAGE_TRANSIENT_BACKOFF_BASE_SECS`. Mirrors the teacher's
/// `compute_retry_backoff_seconds`, generalized from a fixed retry count to a
/// closure invoked once per attempt.
pub fn compute_stage_backoff_seconds(attempt: u32) -> u64 {
    castforge_core::constants::STAGE_TRANSIENT_BACKOFF_BASE_SECS * 2u64.pow(attempt.saturating_sub(1))
}

pub async fn with_stage_retries<F, Fut, T>(label: &str, mut attempt_fn: F) -> Result<T, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 1u32;
    loop {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < castforge_core::constants::STAGE_TRANSIENT_MAX_ATTEMPTS => {
                let backoff = compute_stage_backoff_seconds(attempt);
                tracing::warn!(stage = label, attempt, backoff_secs = backoff, error = %err, "stage attempt failed, retrying");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        assert_eq!(compute_stage_backoff_seconds(1), 2);
        assert_eq!(compute_stage_backoff_seconds(2), 4);
        assert_eq!(compute_stage_backoff_seconds(3), 8);
    }

    #[tokio::test]
    async fn retries_transient_up_to_the_bound() {
        let mut calls = 0;
        let result: Result<(), AppError> = with_stage_retries("test", |_attempt| {
            calls += 1;
            async move {
                if calls < 3 {
                    Err(AppError::Transient("not yet".into()))
                } else {
                    Ok(())
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn stage_permanent_is_never_retried() {
        let mut calls = 0;
        let result: Result<(), AppError> = with_stage_retries("test", |_attempt| {
            calls += 1;
            async move { Err(AppError::StagePermanent("corrupt".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
