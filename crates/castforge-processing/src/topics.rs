//! Topic-list post-processing invariants (spec §4.7 `ExtractTopics`).
//!
//! The topic-service adapter returns raw `(title, start_s, end_s)` triples;
//! this module is where the fixed shape rules (word/char truncation, max
//! span, silence breaks, total count bounds) are enforced before the list is
//! persisted as `topics_v{N}.json`.

use castforge_core::constants::{
    TOPIC_MAX_CHARS_BEFORE_TRUNCATE, TOPIC_MAX_COUNT, TOPIC_MAX_SPAN_SECONDS,
    TOPIC_MAX_WORDS_BEFORE_TRUNCATE, TOPIC_MIN_COUNT, TOPIC_SILENCE_BREAK_THRESHOLD_SECONDS,
};

use crate::template_vars::Topic;

/// A raw topic-service result before any of the fixed shape rules apply.
#[derive(Debug, Clone)]
pub struct RawTopic {
    pub title: String,
    pub start_s: i64,
    pub end_s: i64,
}

/// Truncate a title to at most `TOPIC_MAX_WORDS_BEFORE_TRUNCATE` words and
/// `TOPIC_MAX_CHARS_BEFORE_TRUNCATE` chars. Titles already within both
/// bounds pass through untouched (spec §4.7: "truncate only if...").
pub fn enforce_title_bounds(title: &str) -> String {
    let words: Vec<&str> = title.split_whitespace().collect();
    let truncated = if words.len() > TOPIC_MAX_WORDS_BEFORE_TRUNCATE {
        words[..TOPIC_MAX_WORDS_BEFORE_TRUNCATE].join(" ")
    } else {
        title.to_string()
    };

    if truncated.chars().count() > TOPIC_MAX_CHARS_BEFORE_TRUNCATE {
        truncated.chars().take(TOPIC_MAX_CHARS_BEFORE_TRUNCATE).collect()
    } else {
        truncated
    }
}

/// Split any topic whose span exceeds `TOPIC_MAX_SPAN_SECONDS` into
/// consecutive chunks no longer than that bound (spec §4.7).
pub fn split_long_spans(topics: Vec<RawTopic>) -> Vec<RawTopic> {
    let mut out = Vec::with_capacity(topics.len());
    for topic in topics {
        let span = topic.end_s - topic.start_s;
        if span <= TOPIC_MAX_SPAN_SECONDS {
            out.push(topic);
            continue;
        }

        let mut cursor = topic.start_s;
        let mut part = 1;
        while cursor < topic.end_s {
            let chunk_end = (cursor + TOPIC_MAX_SPAN_SECONDS).min(topic.end_s);
            out.push(RawTopic {
                title: format!("{} (part {})", topic.title, part),
                start_s: cursor,
                end_s: chunk_end,
            });
            cursor = chunk_end;
            part += 1;
        }
    }
    out
}

/// Insert a "Break" entry between adjacent topics wherever a silence gap
/// exceeds `TOPIC_SILENCE_BREAK_THRESHOLD_SECONDS` (spec §4.7). `silences`
/// is the list of `(start_s, end_s)` silence spans detected during trim.
pub fn insert_silence_breaks(topics: Vec<RawTopic>, silences: &[(i64, i64)]) -> Vec<RawTopic> {
    let mut out = Vec::with_capacity(topics.len());
    for (i, topic) in topics.iter().enumerate() {
        out.push(topic.clone());
        if let Some(next) = topics.get(i + 1) {
            let gap_silence = silences
                .iter()
                .find(|(s, e)| *s >= topic.end_s && *e <= next.start_s);
            if let Some((s, e)) = gap_silence {
                if e - s > TOPIC_SILENCE_BREAK_THRESHOLD_SECONDS {
                    out.push(RawTopic {
                        title: "Break".to_string(),
                        start_s: *s,
                        end_s: *e,
                    });
                }
            }
        }
    }
    out
}

/// Target topic count for a recording of this length and extraction mode,
/// clamped to `[TOPIC_MIN_COUNT, TOPIC_MAX_COUNT]` (spec §4.7: "sized by
/// duration and mode").
pub fn target_topic_count(duration_seconds: i64, mode: TopicMode) -> usize {
    let minutes = (duration_seconds / 60).max(1) as usize;
    let per_topic_minutes = match mode {
        TopicMode::Short => 3,
        TopicMode::Long => 6,
    };
    (minutes / per_topic_minutes).clamp(TOPIC_MIN_COUNT, TOPIC_MAX_COUNT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicMode {
    Short,
    Long,
}

impl TopicMode {
    pub fn parse(value: &str) -> Self {
        match value {
            "long" => TopicMode::Long,
            _ => TopicMode::Short,
        }
    }
}

/// Apply the full pipeline of shape rules and collapse raw topics into the
/// final list that gets written to `topics_v{N}.json`.
pub fn finalize(raw: Vec<RawTopic>, silences: &[(i64, i64)]) -> Vec<Topic> {
    let split = split_long_spans(raw);
    let with_breaks = insert_silence_breaks(split, silences);
    with_breaks
        .into_iter()
        .map(|t| Topic {
            title: enforce_title_bounds(&t.title),
            start_s: t.start_s,
            end_s: t.end_s,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_titles_pass_through_untouched() {
        assert_eq!(enforce_title_bounds("Budget review"), "Budget review");
    }

    #[test]
    fn titles_over_word_bound_are_truncated() {
        let long = "one two three four five six seven eight nine";
        let truncated = enforce_title_bounds(long);
        assert_eq!(truncated.split_whitespace().count(), TOPIC_MAX_WORDS_BEFORE_TRUNCATE);
    }

    #[test]
    fn spans_over_bound_are_split() {
        let topic = RawTopic {
            title: "Long discussion".to_string(),
            start_s: 0,
            end_s: TOPIC_MAX_SPAN_SECONDS * 2 + 60,
        };
        let split = split_long_spans(vec![topic]);
        assert_eq!(split.len(), 3);
        assert!(split.iter().all(|t| t.end_s - t.start_s <= TOPIC_MAX_SPAN_SECONDS));
    }

    #[test]
    fn long_silence_gap_inserts_break() {
        let topics = vec![
            RawTopic { title: "A".to_string(), start_s: 0, end_s: 100 },
            RawTopic { title: "B".to_string(), start_s: 600, end_s: 700 },
        ];
        let silences = vec![(100, 600)];
        let with_breaks = insert_silence_breaks(topics, &silences);
        assert_eq!(with_breaks.len(), 3);
        assert_eq!(with_breaks[1].title, "Break");
    }

    #[test]
    fn target_count_is_clamped() {
        assert_eq!(target_topic_count(5 * 60, TopicMode::Short), TOPIC_MIN_COUNT);
        assert_eq!(target_topic_count(400 * 60, TopicMode::Short), TOPIC_MAX_COUNT);
    }
}
