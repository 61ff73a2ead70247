//! Template Matcher (spec §4.4): binds at most one Template to a Recording.

use castforge_core::error::AppError;
use castforge_core::models::recording::Recording;
use castforge_core::models::source::SourceType;
use castforge_db::TemplateRepository;
use uuid::Uuid;

#[derive(Clone)]
pub struct TemplateMatcher {
    templates: TemplateRepository,
}

impl TemplateMatcher {
    pub fn new(templates: TemplateRepository) -> Self {
        Self { templates }
    }

    /// First-match-wins over active templates, ordered by `priority` desc
    /// then `created_at` asc; within a template, rules are evaluated in
    /// rule-`priority` order. Returns `None` if no rule matched.
    #[tracing::instrument(skip(self, recording))]
    pub async fn find_match(
        &self,
        tenant_id: Uuid,
        recording: &Recording,
        source_type: SourceType,
    ) -> Result<Option<Uuid>, AppError> {
        let templates = self.templates.list_active_ordered(tenant_id).await?;

        for template in templates {
            let mut rules = self.templates.list_rules(template.id).await?;
            rules.sort_by(|a, b| b.priority.cmp(&a.priority));

            let matched = rules
                .iter()
                .any(|rule| rule.matches(&recording.display_name, source_type, recording.source_id));

            if matched {
                return Ok(Some(template.id));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castforge_core::models::matching_rule::MatchType;

    fn matching_rule(match_type: MatchType, pattern: &str, priority: i32) -> castforge_core::models::matching_rule::MatchingRule {
        castforge_core::models::matching_rule::MatchingRule {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            match_type,
            pattern: pattern.to_string(),
            source_type: None,
            source_id: None,
            priority,
        }
    }

    #[test]
    fn rules_ordered_by_priority_descending() {
        let low = matching_rule(MatchType::Contains, "standup", 1);
        let high = matching_rule(MatchType::Exact, "Weekly Standup", 10);
        let mut rules = vec![low, high.clone()];
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        assert_eq!(rules[0].pattern, high.pattern);
    }
}
