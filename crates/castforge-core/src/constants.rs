//! Fixed constants defined directly by the specification (not environment-tunable).

/// Stage retry budget inside a single stage runner invocation (spec §7): up
/// to 3 attempts, exponential backoff starting at 2s.
pub const STAGE_TRANSIENT_MAX_ATTEMPTS: u32 = 3;
pub const STAGE_TRANSIENT_BACKOFF_BASE_SECS: u64 = 2;

/// At most 2 concurrent transcription calls per tenant (spec §4.7, §5).
pub const MAX_CONCURRENT_TRANSCRIPTIONS_PER_TENANT: usize = 2;

/// At most 2 concurrent upload calls per recording (spec §4.7, §5).
pub const MAX_CONCURRENT_UPLOADS_PER_RECORDING: usize = 2;

/// Topic extraction bounds (spec §4.7).
pub const TOPIC_MIN_WORDS: usize = 3;
pub const TOPIC_MAX_WORDS_BEFORE_TRUNCATE: usize = 7;
pub const TOPIC_MAX_CHARS_BEFORE_TRUNCATE: usize = 150;
pub const TOPIC_MAX_SPAN_SECONDS: i64 = 12 * 60;
pub const TOPIC_SILENCE_BREAK_THRESHOLD_SECONDS: i64 = 8 * 60;
pub const TOPIC_MIN_COUNT: usize = 10;
pub const TOPIC_MAX_COUNT: usize = 30;

/// Default top-N topics collapsed into `{themes}` (spec §6).
pub const THEMES_DEFAULT_MAX_COUNT: usize = 3;

/// The five recognized `topics_display` formats (spec §6, §9 Open Questions — fixed set, no others).
pub const TOPICS_DISPLAY_FORMATS: &[&str] = &[
    "numbered_list",
    "bullet_list",
    "dash_list",
    "comma_separated",
    "inline",
];

/// Temp file sweep window for `<root>/temp/<tenant_id>/<job_uuid>/...` (spec §4.11).
pub const TEMP_SWEEP_AFTER_HOURS: i64 = 24;

/// Sync-time full-pipeline eligibility bounds (spec §4.9 step 2): a synced
/// candidate only runs the full pipeline when both bounds are exceeded;
/// otherwise it is inserted with `blank_record = true` and the pipeline is
/// skipped. Distinct from (and stricter than) `Recording::is_blank`'s own
/// bounds, which gate the Trim stage's internal short-circuit rather than
/// sync-time intake.
pub const SYNC_MIN_DURATION_SECONDS_FOR_FULL_PIPELINE: i64 = 30 * 60;
pub const SYNC_MIN_SIZE_BYTES_FOR_FULL_PIPELINE: i64 = 40 * 1024 * 1024;
