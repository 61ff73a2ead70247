//! Template variable substitution for upload metadata (spec §6).
//!
//! Every placeholder's substitution contract is fixed byte-for-byte by the
//! specification; this module is the single place that contract is
//! implemented, shared by the Upload stage (title/description rendering)
//! and anywhere else a metadata template is rendered.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::LazyLock;

/// One detailed topic entry, as stored in `Recording.topics` (spec §4.7 `ExtractTopics`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Topic {
    pub title: String,
    pub start_s: i64,
    pub end_s: i64,
}

/// How `{topics}` renders the full list (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicsDisplayFormat {
    NumberedList,
    BulletList,
    DashList,
    CommaSeparated,
    Inline,
}

impl TopicsDisplayFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "numbered_list" => Some(Self::NumberedList),
            "bullet_list" => Some(Self::BulletList),
            "dash_list" => Some(Self::DashList),
            "comma_separated" => Some(Self::CommaSeparated),
            "inline" => Some(Self::Inline),
            _ => None,
        }
    }
}

/// Everything a template render needs, resolved ahead of time by the caller
/// (the Upload stage) so this module stays pure string formatting.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub display_name: String,
    pub source_name: String,
    pub duration_seconds: i64,
    pub start_time: DateTime<Utc>,
    pub publish_time: DateTime<Utc>,
    pub timezone: Tz,
    /// `true` renders durations as "Xч Yм"; `false` as "Xh Ym".
    pub locale_is_ru: bool,
    pub topics: Vec<Topic>,
    pub topics_display_format: TopicsDisplayFormat,
    pub topics_include_timestamps: bool,
    pub themes_max_count: usize,
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-zA-Z_]+)(?::([^}]*))?\}").unwrap());

/// Render `template`, leaving unknown placeholders untouched (spec §6).
pub fn render(template: &str, ctx: &TemplateContext) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            let fmt = caps.get(2).map(|m| m.as_str());
            resolve(name, fmt, ctx).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn resolve(name: &str, fmt: Option<&str>, ctx: &TemplateContext) -> Option<String> {
    match name {
        "display_name" => Some(ctx.display_name.clone()),
        "source_name" => Some(ctx.source_name.clone()),
        "themes" => Some(themes(ctx)),
        "topics" => Some(topics_list(ctx)),
        "topic" => ctx.topics.first().map(|t| t.title.clone()),
        "duration" => Some(humanize_duration(ctx.duration_seconds, ctx.locale_is_ru)),
        "record_time" => Some(format_time_tokens(ctx.start_time, ctx.timezone, fmt.unwrap_or("datetime"))),
        "publish_time" => Some(format_time_tokens(ctx.publish_time, ctx.timezone, fmt.unwrap_or("datetime"))),
        _ => None,
    }
}

/// `{themes}`: top-N topic titles, comma + space joined (spec §6).
fn themes(ctx: &TemplateContext) -> String {
    ctx.topics
        .iter()
        .take(ctx.themes_max_count.max(1))
        .map(|t| t.title.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn topic_line(t: &Topic, include_timestamps: bool) -> String {
    if include_timestamps {
        format!("{} — {}", format_hms(t.start_s), t.title)
    } else {
        t.title.clone()
    }
}

fn format_hms(total_seconds: i64) -> String {
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// `{topics}`: full list, formatted per `topics_display.format` (spec §6).
fn topics_list(ctx: &TemplateContext) -> String {
    let lines: Vec<String> = ctx
        .topics
        .iter()
        .map(|t| topic_line(t, ctx.topics_include_timestamps))
        .collect();

    match ctx.topics_display_format {
        TopicsDisplayFormat::NumberedList => lines
            .iter()
            .enumerate()
            .map(|(i, l)| format!("{}. {}", i + 1, l))
            .collect::<Vec<_>>()
            .join("\n"),
        TopicsDisplayFormat::BulletList => lines.iter().map(|l| format!("• {l}")).collect::<Vec<_>>().join("\n"),
        TopicsDisplayFormat::DashList => lines.iter().map(|l| format!("- {l}")).collect::<Vec<_>>().join("\n"),
        TopicsDisplayFormat::CommaSeparated => lines.join(", "),
        TopicsDisplayFormat::Inline => lines.join(" | "),
    }
}

/// `{duration}`: minutes, humanised per tenant locale (spec §6).
fn humanize_duration(duration_seconds: i64, locale_is_ru: bool) -> String {
    let total_minutes = duration_seconds / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if locale_is_ru {
        format!("{hours}ч {minutes}м")
    } else {
        format!("{hours}h {minutes}m")
    }
}

/// Inline fmt tokens for `{record_time[:fmt]}` / `{publish_time[:fmt]}` (spec §6).
/// Tokens: `DD`, `MM`, `YY`, `YYYY`, `hh`, `mm`, `ss`, `date`, `time`, `datetime`.
fn format_time_tokens(at: DateTime<Utc>, tz: Tz, fmt: &str) -> String {
    let local = tz.from_utc_datetime(&at.naive_utc());
    match fmt {
        "date" => local.format("%d.%m.%Y").to_string(),
        "time" => local.format("%H:%M:%S").to_string(),
        "datetime" => local.format("%d.%m.%Y %H:%M:%S").to_string(),
        tokens => {
            let mut out = String::new();
            let mut chars = tokens.chars().peekable();
            while let Some(c) = chars.next() {
                let mut run = String::from(c);
                while chars.peek() == Some(&c) {
                    run.push(chars.next().unwrap());
                }
                out.push_str(&substitute_token(&run, &local));
            }
            out
        }
    }
}

fn substitute_token(token: &str, local: &DateTime<Tz>) -> String {
    match token {
        "YYYY" => local.format("%Y").to_string(),
        "YY" => local.format("%y").to_string(),
        "MM" => local.format("%m").to_string(),
        "DD" => local.format("%d").to_string(),
        "hh" => local.format("%H").to_string(),
        "mm" => local.format("%M").to_string(),
        "ss" => local.format("%S").to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx() -> TemplateContext {
        TemplateContext {
            display_name: "Weekly Standup".to_string(),
            source_name: "Main Conferencing".to_string(),
            duration_seconds: 3725,
            start_time: Utc.with_ymd_and_hms(2024, 12, 25, 9, 0, 0).unwrap(),
            publish_time: Utc.with_ymd_and_hms(2024, 12, 25, 10, 0, 0).unwrap(),
            timezone: Tz::UTC,
            locale_is_ru: false,
            topics: vec![
                Topic { title: "Kickoff".to_string(), start_s: 0, end_s: 120 },
                Topic { title: "Roadmap review".to_string(), start_s: 120, end_s: 600 },
            ],
            topics_display_format: TopicsDisplayFormat::NumberedList,
            topics_include_timestamps: false,
            themes_max_count: 3,
        }
    }

    #[test]
    fn record_time_formats_with_explicit_tokens() {
        let rendered = render("{record_time:DD.MM.YYYY}", &ctx());
        assert_eq!(rendered, "25.12.2024");
    }

    #[test]
    fn unknown_placeholders_are_left_literal() {
        let rendered = render("{display_name} [{nope}]", &ctx());
        assert_eq!(rendered, "Weekly Standup [{nope}]");
    }

    #[test]
    fn themes_joins_top_n_with_comma_space() {
        assert_eq!(themes(&ctx()), "Kickoff, Roadmap review");
    }

    #[test]
    fn duration_humanizes_hours_and_minutes() {
        assert_eq!(humanize_duration(3725, false), "1h 2m");
        assert_eq!(humanize_duration(3725, true), "1ч 2м");
    }

    #[test]
    fn numbered_list_format() {
        let rendered = topics_list(&ctx());
        assert_eq!(rendered, "1. Kickoff\n2. Roadmap review");
    }

    #[test]
    fn topic_is_first_detailed_title() {
        assert_eq!(render("{topic}", &ctx()), "Kickoff");
    }
}
