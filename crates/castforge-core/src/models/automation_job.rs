use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Schedule descriptor variants (spec §3 `Automation Job`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleDescriptor {
    TimeOfDay { time: String, timezone: String },
    EveryNHours { n: u32 },
    WeekdaysAndTime { weekdays: Vec<u8>, time: String, timezone: String },
    Cron { expression: String },
}

/// Upper bound on how far forward `next_after` searches for a match before
/// giving up, so a malformed descriptor fails fast instead of looping
/// forever.
const NEXT_RUN_SEARCH_LIMIT_MINUTES: i64 = 366 * 24 * 60;

impl ScheduleDescriptor {
    /// The first instant strictly after `now` that this schedule fires,
    /// used both to seed a brand new job's `next_run` and to advance it
    /// after a tick (spec §4.9's bucket-sort key is this same tuple).
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ScheduleDescriptor::EveryNHours { n } => {
                if *n == 0 {
                    return None;
                }
                Some(now + Duration::hours(*n as i64))
            }
            ScheduleDescriptor::TimeOfDay { time, timezone } => next_time_of_day(now, time, timezone, None),
            ScheduleDescriptor::WeekdaysAndTime { weekdays, time, timezone } => {
                next_time_of_day(now, time, timezone, Some(weekdays))
            }
            ScheduleDescriptor::Cron { expression } => next_cron_match(now, expression),
        }
    }
}

fn parse_tz(timezone: &str) -> Option<Tz> {
    timezone.parse().ok()
}

fn parse_time(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(time, "%H:%M").ok()
}

/// Next occurrence of `time` (in `timezone`), optionally restricted to one
/// of `weekdays` (`0` = Sunday, matching the spec's day numbering), walking
/// forward day by day from `now`.
fn next_time_of_day(now: DateTime<Utc>, time: &str, timezone: &str, weekdays: Option<&[u8]>) -> Option<DateTime<Utc>> {
    let tz = parse_tz(timezone)?;
    let time_of_day = parse_time(time)?;
    let local_now = now.with_timezone(&tz);

    for day_offset in 0..=7 {
        let candidate_date = (local_now + Duration::days(day_offset)).date_naive();
        if let Some(weekdays) = weekdays {
            let weekday_number = candidate_date.weekday().num_days_from_sunday() as u8;
            if !weekdays.contains(&weekday_number) {
                continue;
            }
        }
        let candidate_naive = candidate_date.and_time(time_of_day);
        let candidate = match tz.from_local_datetime(&candidate_naive).single() {
            Some(dt) => dt,
            None => continue,
        };
        if candidate > local_now {
            return Some(candidate.with_timezone(&Utc));
        }
    }
    None
}

/// Minimal five-field cron matcher (`minute hour day-of-month month
/// day-of-week`): each field is `*` or a comma-separated list of integers.
/// Steps minute by minute, bounded by `NEXT_RUN_SEARCH_LIMIT_MINUTES`.
fn next_cron_match(now: DateTime<Utc>, expression: &str) -> Option<DateTime<Utc>> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return None;
    }
    let minute_set = parse_cron_field(fields[0])?;
    let hour_set = parse_cron_field(fields[1])?;
    let dom_set = parse_cron_field(fields[2])?;
    let month_set = parse_cron_field(fields[3])?;
    let dow_set = parse_cron_field(fields[4])?;

    let mut candidate = now + Duration::minutes(1);
    candidate = candidate
        .with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(candidate);

    for _ in 0..NEXT_RUN_SEARCH_LIMIT_MINUTES {
        let weekday_number = candidate.weekday().num_days_from_sunday() as u32;
        if cron_field_matches(&minute_set, candidate.minute())
            && cron_field_matches(&hour_set, candidate.hour())
            && cron_field_matches(&dom_set, candidate.day())
            && cron_field_matches(&month_set, candidate.month())
            && cron_field_matches(&dow_set, weekday_number)
        {
            return Some(candidate);
        }
        candidate += Duration::minutes(1);
    }
    None
}

fn parse_cron_field(field: &str) -> Option<Option<Vec<u32>>> {
    if field == "*" {
        return Some(None);
    }
    field
        .split(',')
        .map(|part| part.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()
        .map(Some)
}

fn cron_field_matches(field: &Option<Vec<u32>>, value: u32) -> bool {
    match field {
        None => true,
        Some(values) => values.contains(&value),
    }
}

/// Outcome of the most recent invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "job_last_status", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum JobLastStatus {
    Running,
    Success,
    Failed,
    Skipped,
}

/// A scheduled binding of a Template to a recurring trigger (spec §3 `Automation Job`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AutomationJob {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub template_id: Uuid,
    pub schedule: sqlx::types::Json<ScheduleDescriptor>,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub last_status: Option<JobLastStatus>,
    pub retry_max_attempts: i32,
    pub retry_delay_seconds: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutomationJob {
    /// Exponential retry delay for attempt `attempt` (1-indexed), spec §4.9.
    pub fn retry_backoff_seconds(&self, attempt: u32) -> i64 {
        self.retry_delay_seconds * 2i64.pow(attempt.saturating_sub(1))
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run.is_some_and(|nr| nr <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_backoff_doubles_each_attempt() {
        let job = AutomationJob {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            schedule: sqlx::types::Json(ScheduleDescriptor::EveryNHours { n: 6 }),
            enabled: true,
            last_run: None,
            next_run: None,
            last_status: None,
            retry_max_attempts: 3,
            retry_delay_seconds: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(job.retry_backoff_seconds(1), 10);
        assert_eq!(job.retry_backoff_seconds(2), 20);
        assert_eq!(job.retry_backoff_seconds(3), 40);
    }

    #[test]
    fn every_n_hours_advances_by_exactly_n_hours() {
        let schedule = ScheduleDescriptor::EveryNHours { n: 6 };
        let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(schedule.next_after(now), Some(now + chrono::Duration::hours(6)));
    }

    #[test]
    fn time_of_day_rolls_to_tomorrow_once_past() {
        let schedule = ScheduleDescriptor::TimeOfDay {
            time: "06:00".into(),
            timezone: "Europe/Moscow".into(),
        };
        let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let next = schedule.next_after(now).expect("schedule should resolve");
        assert!(next > now);

        let moscow = next.with_timezone(&chrono_tz::Europe::Moscow);
        assert_eq!(moscow.hour(), 6);
        assert_eq!(moscow.minute(), 0);
    }

    #[test]
    fn weekdays_and_time_skips_non_matching_days() {
        // 2026-01-01 is a Thursday (weekday 4).
        let schedule = ScheduleDescriptor::WeekdaysAndTime {
            weekdays: vec![1, 3], // Monday, Wednesday
            time: "09:00".into(),
            timezone: "UTC".into(),
        };
        let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let next = schedule.next_after(now).expect("schedule should resolve");
        assert_eq!(next.weekday().num_days_from_sunday(), 3); // next Wednesday
    }

    #[test]
    fn cron_matches_specific_minute_and_hour() {
        let schedule = ScheduleDescriptor::Cron {
            expression: "30 6 * * *".into(),
        };
        let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let next = schedule.next_after(now).expect("cron expression should resolve");
        assert_eq!(next.hour(), 6);
        assert_eq!(next.minute(), 30);
    }
}
