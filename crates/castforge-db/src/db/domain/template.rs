use castforge_core::error::AppError;
use castforge_core::models::matching_rule::{MatchType, MatchingRule};
use castforge_core::models::source::SourceType;
use castforge_core::models::template::{Template, TemplateStatus};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// One matching rule as submitted by a caller creating or updating a template.
#[derive(Debug, Clone)]
pub struct MatchingRuleInput {
    pub match_type: MatchType,
    pub pattern: String,
    pub source_type: Option<SourceType>,
    pub source_id: Option<Uuid>,
    pub priority: i32,
}

#[derive(Clone)]
pub struct TemplateRepository {
    pool: PgPool,
}

impl TemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, config_overrides, output_configs, rules), fields(db.table = "templates", db.operation = "insert"))]
    pub async fn create(
        &self,
        tenant_id: Uuid,
        name: &str,
        priority: i32,
        config_overrides: JsonValue,
        output_configs: JsonValue,
        rules: &[MatchingRuleInput],
    ) -> Result<(Template, Vec<MatchingRule>), AppError> {
        for rule in rules {
            if rule.match_type == MatchType::Regex {
                regex::Regex::new(&rule.pattern)
                    .map_err(|e| AppError::Validation(format!("invalid regex pattern: {e}")))?;
            }
        }

        let mut tx = self.pool.begin().await?;

        let template = sqlx::query_as::<Postgres, Template>(
            r#"
            INSERT INTO templates (id, tenant_id, name, status, priority, config_overrides, output_configs, created_at, updated_at)
            VALUES ($1, $2, $3, 'draft', $4, $5, $6, now(), now())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(name)
        .bind(priority)
        .bind(config_overrides)
        .bind(output_configs)
        .fetch_one(&mut *tx)
        .await?;

        let mut inserted_rules = Vec::with_capacity(rules.len());
        for rule in rules {
            let row = sqlx::query_as::<Postgres, MatchingRule>(
                r#"
                INSERT INTO matching_rules (id, template_id, match_type, pattern, source_type, source_id, priority)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(template.id)
            .bind(rule.match_type)
            .bind(&rule.pattern)
            .bind(rule.source_type)
            .bind(rule.source_id)
            .bind(rule.priority)
            .fetch_one(&mut *tx)
            .await?;
            inserted_rules.push(row);
        }

        tx.commit().await?;
        Ok((template, inserted_rules))
    }

    #[tracing::instrument(skip(self), fields(db.table = "templates", db.operation = "select"))]
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Template, AppError> {
        sqlx::query_as::<Postgres, Template>("SELECT * FROM templates WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("template not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "matching_rules", db.operation = "select"))]
    pub async fn list_rules(&self, template_id: Uuid) -> Result<Vec<MatchingRule>, AppError> {
        sqlx::query_as::<Postgres, MatchingRule>(
            "SELECT * FROM matching_rules WHERE template_id = $1 ORDER BY priority DESC",
        )
        .bind(template_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "templates", db.operation = "select"))]
    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Template>, AppError> {
        sqlx::query_as::<Postgres, Template>(
            "SELECT * FROM templates WHERE tenant_id = $1 ORDER BY priority DESC, created_at ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Templates eligible for Template Matcher evaluation, in first-match-wins
    /// order: `priority` descending, then `created_at` ascending (spec §4.4).
    #[tracing::instrument(skip(self), fields(db.table = "templates", db.operation = "select"))]
    pub async fn list_active_ordered(&self, tenant_id: Uuid) -> Result<Vec<Template>, AppError> {
        sqlx::query_as::<Postgres, Template>(
            "SELECT * FROM templates WHERE tenant_id = $1 AND status = 'active' ORDER BY priority DESC, created_at ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, config_overrides, output_configs), fields(db.table = "templates", db.operation = "update"))]
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        name: &str,
        status: TemplateStatus,
        priority: i32,
        config_overrides: JsonValue,
        output_configs: JsonValue,
    ) -> Result<Template, AppError> {
        sqlx::query_as::<Postgres, Template>(
            r#"
            UPDATE templates
            SET name = $3, status = $4, priority = $5, config_overrides = $6, output_configs = $7, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(name)
        .bind(status)
        .bind(priority)
        .bind(config_overrides)
        .bind(output_configs)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("template not found".into()))
    }

    #[tracing::instrument(skip(self, rules), fields(db.table = "matching_rules", db.operation = "replace"))]
    pub async fn replace_rules(
        &self,
        template_id: Uuid,
        rules: &[MatchingRuleInput],
    ) -> Result<Vec<MatchingRule>, AppError> {
        for rule in rules {
            if rule.match_type == MatchType::Regex {
                regex::Regex::new(&rule.pattern)
                    .map_err(|e| AppError::Validation(format!("invalid regex pattern: {e}")))?;
            }
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM matching_rules WHERE template_id = $1")
            .bind(template_id)
            .execute(&mut *tx)
            .await?;

        let mut inserted = Vec::with_capacity(rules.len());
        for rule in rules {
            let row = sqlx::query_as::<Postgres, MatchingRule>(
                r#"
                INSERT INTO matching_rules (id, template_id, match_type, pattern, source_type, source_id, priority)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(template_id)
            .bind(rule.match_type)
            .bind(&rule.pattern)
            .bind(rule.source_type)
            .bind(rule.source_id)
            .bind(rule.priority)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row);
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Deleting a template unmaps (does not delete) every recording bound to
    /// it, leaving their pipeline state untouched (spec §6 `DeleteTemplate`).
    #[tracing::instrument(skip(self), fields(db.table = "templates", db.operation = "delete"))]
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM templates WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound("template not found".into()));
        }

        sqlx::query(
            "UPDATE recordings SET template_id = NULL, is_mapped = false WHERE template_id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
