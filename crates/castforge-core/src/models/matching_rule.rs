use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::source::SourceType;

/// How a rule's `pattern` is applied to the recording's `display_name` (spec §4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "match_type", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Contains,
    Regex,
}

/// Child of Template: one candidate binding condition (spec §3 `Matching Rule`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MatchingRule {
    pub id: Uuid,
    pub template_id: Uuid,
    pub match_type: MatchType,
    pub pattern: String,
    pub source_type: Option<SourceType>,
    pub source_id: Option<Uuid>,
    pub priority: i32,
}

impl MatchingRule {
    /// Validate `pattern` is well-formed for this rule's `match_type`
    /// (only `regex` rules can be malformed; used at Template create/update time).
    pub fn validate_pattern(&self) -> Result<(), String> {
        if self.match_type == MatchType::Regex {
            regex::Regex::new(&self.pattern).map_err(|e| format!("invalid regex pattern: {}", e))?;
        }
        Ok(())
    }

    /// Whether this rule matches the given recording attributes (spec §4.4).
    pub fn matches(&self, display_name: &str, source_type: SourceType, source_id: Uuid) -> bool {
        if let Some(required_type) = self.source_type {
            if required_type != source_type {
                return false;
            }
        }
        if let Some(required_id) = self.source_id {
            if required_id != source_id {
                return false;
            }
        }

        match self.match_type {
            MatchType::Exact => display_name == self.pattern,
            MatchType::Contains => display_name
                .to_lowercase()
                .contains(&self.pattern.to_lowercase()),
            MatchType::Regex => regex::Regex::new(&format!("^{}$", self.pattern))
                .map(|re| re.is_match(display_name))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(match_type: MatchType, pattern: &str) -> MatchingRule {
        MatchingRule {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            match_type,
            pattern: pattern.to_string(),
            source_type: None,
            source_id: None,
            priority: 0,
        }
    }

    #[test]
    fn exact_match_is_case_sensitive() {
        let r = rule(MatchType::Exact, "Weekly Standup");
        assert!(r.matches("Weekly Standup", SourceType::LocalFile, Uuid::new_v4()));
        assert!(!r.matches("weekly standup", SourceType::LocalFile, Uuid::new_v4()));
    }

    #[test]
    fn contains_match_is_case_insensitive() {
        let r = rule(MatchType::Contains, "standup");
        assert!(r.matches("Weekly STANDUP call", SourceType::LocalFile, Uuid::new_v4()));
    }

    #[test]
    fn regex_match_is_anchored() {
        let r = rule(MatchType::Regex, r"ML-\d+");
        assert!(r.matches("ML-42", SourceType::LocalFile, Uuid::new_v4()));
        assert!(!r.matches("prefix ML-42 suffix", SourceType::LocalFile, Uuid::new_v4()));
    }

    #[test]
    fn source_type_filter_excludes_mismatches() {
        let mut r = rule(MatchType::Contains, "standup");
        r.source_type = Some(SourceType::CloudDrive);
        assert!(!r.matches("standup", SourceType::LocalFile, Uuid::new_v4()));
        assert!(r.matches("standup", SourceType::CloudDrive, Uuid::new_v4()));
    }

    #[test]
    fn invalid_regex_pattern_fails_validation() {
        let r = rule(MatchType::Regex, "(unclosed");
        assert!(r.validate_pattern().is_err());
    }
}
