//! Template + Matching Rule operations (spec §6): `CreateTemplate`,
//! `UpdateTemplate`, `DeleteTemplate`, `RematchTemplate`, plus the reads an
//! HTTP router needs to render them.

use castforge_core::error::AppError;
use castforge_core::models::matching_rule::MatchingRule;
use castforge_core::models::template::{Template, TemplateStatus};
use castforge_core::models::tenant::TenantContext;
use castforge_db::db::domain::template::MatchingRuleInput;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::context::ApiContext;
use crate::permissions;

pub async fn create_template(
    ctx: &ApiContext,
    tenant_ctx: &TenantContext,
    name: &str,
    priority: i32,
    config_overrides: JsonValue,
    output_configs: JsonValue,
    rules: &[MatchingRuleInput],
) -> Result<(Template, Vec<MatchingRule>), AppError> {
    permissions::require(tenant_ctx, |p| p.can_create_templates, "CreateTemplate")?;
    ctx.templates
        .create(tenant_ctx.tenant_id, name, priority, config_overrides, output_configs, rules)
        .await
}

pub async fn get_template(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<Template, AppError> {
    ctx.templates.get(tenant_ctx.tenant_id, id).await
}

pub async fn list_templates(ctx: &ApiContext, tenant_ctx: &TenantContext) -> Result<Vec<Template>, AppError> {
    ctx.templates.list(tenant_ctx.tenant_id).await
}

#[allow(clippy::too_many_arguments)]
pub async fn update_template(
    ctx: &ApiContext,
    tenant_ctx: &TenantContext,
    id: Uuid,
    name: &str,
    status: TemplateStatus,
    priority: i32,
    config_overrides: JsonValue,
    output_configs: JsonValue,
    rules: Option<&[MatchingRuleInput]>,
) -> Result<(Template, Vec<MatchingRule>), AppError> {
    permissions::require(tenant_ctx, |p| p.can_create_templates, "UpdateTemplate")?;
    let template = ctx
        .templates
        .update(tenant_ctx.tenant_id, id, name, status, priority, config_overrides, output_configs)
        .await?;

    let rules = match rules {
        Some(rules) => ctx.templates.replace_rules(id, rules).await?,
        None => ctx.templates.list_rules(id).await?,
    };
    Ok((template, rules))
}

/// Unmaps (does not delete) every recording bound to this template (spec §6).
pub async fn delete_template(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
    permissions::require(tenant_ctx, |p| p.can_create_templates, "DeleteTemplate")?;
    ctx.templates.delete(tenant_ctx.tenant_id, id).await
}

/// Re-runs the Template Matcher over every unmapped recording for the
/// tenant. Idempotent: a recording already bound is left untouched, and
/// running it twice in a row yields the same set of bindings (spec §8).
pub async fn rematch_template(ctx: &ApiContext, tenant_ctx: &TenantContext) -> Result<Vec<Uuid>, AppError> {
    let unmapped = ctx.recordings.list_unmapped(tenant_ctx.tenant_id).await?;
    let mut bound = Vec::new();

    for recording in unmapped {
        let source = ctx.sources.get(tenant_ctx.tenant_id, recording.source_id).await?;
        if let Some(template_id) = ctx
            .template_matcher
            .find_match(tenant_ctx.tenant_id, &recording, source.source_type)
            .await?
        {
            ctx.recordings.bind_template(tenant_ctx.tenant_id, recording.id, template_id).await?;
            bound.push(recording.id);
        }
    }

    Ok(bound)
}
