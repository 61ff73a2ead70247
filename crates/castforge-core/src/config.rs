//! Configuration module
//!
//! `BaseConfig` carries settings shared by every binary (db pool, rate
//! limiting, environment name); `PipelineConfig` carries the settings
//! specific to the recording pipeline (ffmpeg path, stage timeouts, retry
//! knobs, encryption key source). `Config` wraps both and is what the rest
//! of the workspace constructs once at startup via `Config::from_env`.

use std::env;

const DB_MAX_CONNECTIONS: u32 = 20;
const DB_TIMEOUT_SECS: u64 = 30;
const HTTP_RATE_LIMIT_PER_MINUTE: u32 = 100;

const STAGE_TIMEOUT_DOWNLOAD_SECS: u64 = 600;
const STAGE_TIMEOUT_TRIM_SECS: u64 = 1800;
const STAGE_TIMEOUT_TRANSCRIBE_SECS: u64 = 3600;
const STAGE_TIMEOUT_EXTRACT_TOPICS_SECS: u64 = 300;
const STAGE_TIMEOUT_GENERATE_SUBTITLES_SECS: u64 = 300;
const STAGE_TIMEOUT_UPLOAD_SECS: u64 = 1800;

const STAGE_MAX_RETRIES: u32 = 3;
const STAGE_RETRY_BASE_BACKOFF_SECS: u64 = 5;
const STAGE_RETRY_MAX_BACKOFF_SECS: u64 = 300;

const MAX_CONCURRENT_PROCESSES_DEFAULT: u32 = 2;
const MAX_CONCURRENT_TRANSCRIPTIONS_PER_TENANT_DEFAULT: u32 = 1;
const MAX_UPLOAD_FANOUT_DEFAULT: u32 = 4;

const SCHEDULER_TICK_INTERVAL_SECS: u64 = 60;
const SCHEDULER_BUCKET_WIDTH_SECS: u64 = 60;

const CREDENTIAL_EXPIRY_SWEEP_INTERVAL_SECS: u64 = 86_400;

/// Settings shared by every castforge binary (worker, scheduler tick).
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub environment: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub http_rate_limit_per_minute: u32,
}

/// Settings specific to the recording processing pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub base: BaseConfig,
    pub database_url: String,
    pub encryption_key: String,

    pub ffmpeg_path: String,
    pub local_storage_path: String,

    pub stage_timeout_download_secs: u64,
    pub stage_timeout_trim_secs: u64,
    pub stage_timeout_transcribe_secs: u64,
    pub stage_timeout_extract_topics_secs: u64,
    pub stage_timeout_generate_subtitles_secs: u64,
    pub stage_timeout_upload_secs: u64,

    pub stage_max_retries: u32,
    pub stage_retry_base_backoff_secs: u64,
    pub stage_retry_max_backoff_secs: u64,

    pub max_concurrent_processes_default: u32,
    pub max_concurrent_transcriptions_per_tenant_default: u32,
    pub max_upload_fanout_default: u32,

    pub scheduler_tick_interval_secs: u64,
    pub scheduler_bucket_width_secs: u64,

    pub credential_expiry_sweep_interval_secs: u64,
}

/// Process-wide application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<PipelineConfig>);

impl Config {
    fn inner(&self) -> &PipelineConfig {
        &self.0
    }

    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = PipelineConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn http_rate_limit_per_minute(&self) -> u32 {
        self.inner().base.http_rate_limit_per_minute
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn encryption_key(&self) -> &str {
        &self.inner().encryption_key
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.inner().ffmpeg_path
    }

    pub fn local_storage_path(&self) -> &str {
        &self.inner().local_storage_path
    }

    pub fn stage_timeout_secs(&self, stage: &str) -> u64 {
        let c = self.inner();
        match stage {
            "download" => c.stage_timeout_download_secs,
            "trim" => c.stage_timeout_trim_secs,
            "transcribe" => c.stage_timeout_transcribe_secs,
            "extract_topics" => c.stage_timeout_extract_topics_secs,
            "generate_subtitles" => c.stage_timeout_generate_subtitles_secs,
            "upload" => c.stage_timeout_upload_secs,
            _ => c.stage_timeout_upload_secs,
        }
    }

    pub fn stage_max_retries(&self) -> u32 {
        self.inner().stage_max_retries
    }

    pub fn stage_retry_base_backoff_secs(&self) -> u64 {
        self.inner().stage_retry_base_backoff_secs
    }

    pub fn stage_retry_max_backoff_secs(&self) -> u64 {
        self.inner().stage_retry_max_backoff_secs
    }

    pub fn max_concurrent_processes_default(&self) -> u32 {
        self.inner().max_concurrent_processes_default
    }

    pub fn max_concurrent_transcriptions_per_tenant_default(&self) -> u32 {
        self.inner().max_concurrent_transcriptions_per_tenant_default
    }

    pub fn max_upload_fanout_default(&self) -> u32 {
        self.inner().max_upload_fanout_default
    }

    pub fn scheduler_tick_interval_secs(&self) -> u64 {
        self.inner().scheduler_tick_interval_secs
    }

    pub fn scheduler_bucket_width_secs(&self) -> u64 {
        self.inner().scheduler_bucket_width_secs
    }

    pub fn credential_expiry_sweep_interval_secs(&self) -> u64 {
        self.inner().credential_expiry_sweep_interval_secs
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let base = BaseConfig {
            environment,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECS", DB_TIMEOUT_SECS),
            http_rate_limit_per_minute: env_parse(
                "HTTP_RATE_LIMIT_PER_MINUTE",
                HTTP_RATE_LIMIT_PER_MINUTE,
            ),
        };

        let database_url = env::var("CASTFORGE_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .map_err(|_| anyhow::anyhow!("CASTFORGE_DATABASE_URL or DATABASE_URL must be set"))?;

        let encryption_key = env::var("ENCRYPTION_KEY")
            .map_err(|_| anyhow::anyhow!("ENCRYPTION_KEY must be set"))?;

        Ok(PipelineConfig {
            base,
            database_url,
            encryption_key,
            ffmpeg_path: env_or("FFMPEG_PATH", "/usr/bin/ffmpeg"),
            local_storage_path: env_or("LOCAL_STORAGE_PATH", "./data/castforge"),
            stage_timeout_download_secs: env_parse(
                "STAGE_TIMEOUT_DOWNLOAD_SECS",
                STAGE_TIMEOUT_DOWNLOAD_SECS,
            ),
            stage_timeout_trim_secs: env_parse("STAGE_TIMEOUT_TRIM_SECS", STAGE_TIMEOUT_TRIM_SECS),
            stage_timeout_transcribe_secs: env_parse(
                "STAGE_TIMEOUT_TRANSCRIBE_SECS",
                STAGE_TIMEOUT_TRANSCRIBE_SECS,
            ),
            stage_timeout_extract_topics_secs: env_parse(
                "STAGE_TIMEOUT_EXTRACT_TOPICS_SECS",
                STAGE_TIMEOUT_EXTRACT_TOPICS_SECS,
            ),
            stage_timeout_generate_subtitles_secs: env_parse(
                "STAGE_TIMEOUT_GENERATE_SUBTITLES_SECS",
                STAGE_TIMEOUT_GENERATE_SUBTITLES_SECS,
            ),
            stage_timeout_upload_secs: env_parse("STAGE_TIMEOUT_UPLOAD_SECS", STAGE_TIMEOUT_UPLOAD_SECS),
            stage_max_retries: env_parse("STAGE_MAX_RETRIES", STAGE_MAX_RETRIES),
            stage_retry_base_backoff_secs: env_parse(
                "STAGE_RETRY_BASE_BACKOFF_SECS",
                STAGE_RETRY_BASE_BACKOFF_SECS,
            ),
            stage_retry_max_backoff_secs: env_parse(
                "STAGE_RETRY_MAX_BACKOFF_SECS",
                STAGE_RETRY_MAX_BACKOFF_SECS,
            ),
            max_concurrent_processes_default: env_parse(
                "MAX_CONCURRENT_PROCESSES_DEFAULT",
                MAX_CONCURRENT_PROCESSES_DEFAULT,
            ),
            max_concurrent_transcriptions_per_tenant_default: env_parse(
                "MAX_CONCURRENT_TRANSCRIPTIONS_PER_TENANT_DEFAULT",
                MAX_CONCURRENT_TRANSCRIPTIONS_PER_TENANT_DEFAULT,
            ),
            max_upload_fanout_default: env_parse("MAX_UPLOAD_FANOUT_DEFAULT", MAX_UPLOAD_FANOUT_DEFAULT),
            scheduler_tick_interval_secs: env_parse(
                "SCHEDULER_TICK_INTERVAL_SECS",
                SCHEDULER_TICK_INTERVAL_SECS,
            ),
            scheduler_bucket_width_secs: env_parse(
                "SCHEDULER_BUCKET_WIDTH_SECS",
                SCHEDULER_BUCKET_WIDTH_SECS,
            ),
            credential_expiry_sweep_interval_secs: env_parse(
                "CREDENTIAL_EXPIRY_SWEEP_INTERVAL_SECS",
                CREDENTIAL_EXPIRY_SWEEP_INTERVAL_SECS,
            ),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.encryption_key.len() < 32 {
            return Err(anyhow::anyhow!(
                "ENCRYPTION_KEY must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgresql://") && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "CASTFORGE_DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.scheduler_bucket_width_secs == 0 {
            return Err(anyhow::anyhow!("SCHEDULER_BUCKET_WIDTH_SECS must be > 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PipelineConfig {
        PipelineConfig {
            base: BaseConfig {
                environment: "development".to_string(),
                db_max_connections: DB_MAX_CONNECTIONS,
                db_timeout_seconds: DB_TIMEOUT_SECS,
                http_rate_limit_per_minute: HTTP_RATE_LIMIT_PER_MINUTE,
            },
            database_url: "postgresql://localhost/castforge".to_string(),
            encryption_key: "x".repeat(32),
            ffmpeg_path: "/usr/bin/ffmpeg".to_string(),
            local_storage_path: "./data".to_string(),
            stage_timeout_download_secs: STAGE_TIMEOUT_DOWNLOAD_SECS,
            stage_timeout_trim_secs: STAGE_TIMEOUT_TRIM_SECS,
            stage_timeout_transcribe_secs: STAGE_TIMEOUT_TRANSCRIBE_SECS,
            stage_timeout_extract_topics_secs: STAGE_TIMEOUT_EXTRACT_TOPICS_SECS,
            stage_timeout_generate_subtitles_secs: STAGE_TIMEOUT_GENERATE_SUBTITLES_SECS,
            stage_timeout_upload_secs: STAGE_TIMEOUT_UPLOAD_SECS,
            stage_max_retries: STAGE_MAX_RETRIES,
            stage_retry_base_backoff_secs: STAGE_RETRY_BASE_BACKOFF_SECS,
            stage_retry_max_backoff_secs: STAGE_RETRY_MAX_BACKOFF_SECS,
            max_concurrent_processes_default: MAX_CONCURRENT_PROCESSES_DEFAULT,
            max_concurrent_transcriptions_per_tenant_default:
                MAX_CONCURRENT_TRANSCRIPTIONS_PER_TENANT_DEFAULT,
            max_upload_fanout_default: MAX_UPLOAD_FANOUT_DEFAULT,
            scheduler_tick_interval_secs: SCHEDULER_TICK_INTERVAL_SECS,
            scheduler_bucket_width_secs: SCHEDULER_BUCKET_WIDTH_SECS,
            credential_expiry_sweep_interval_secs: CREDENTIAL_EXPIRY_SWEEP_INTERVAL_SECS,
        }
    }

    #[test]
    fn rejects_short_encryption_key() {
        let mut cfg = sample();
        cfg.encryption_key = "short".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_postgres_url() {
        let mut cfg = sample();
        cfg.database_url = "mysql://localhost/castforge".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_valid_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn is_production_matches_prod_and_production() {
        let mut cfg = sample();
        cfg.base.environment = "Production".to_string();
        let wrapped = Config(Box::new(cfg));
        assert!(wrapped.is_production());
    }
}
