//! Small shared helper so every operation enforces its permission flag the
//! same way instead of hand-rolling an `if !... { return Err(...) }` per call site.

use castforge_core::error::AppError;
use castforge_core::models::tenant::{TenantContext, TenantPermissions};

pub(crate) fn require(ctx: &TenantContext, flag: impl Fn(&TenantPermissions) -> bool, operation: &str) -> Result<(), AppError> {
    if ctx.require_permission(flag) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!("tenant lacks the permission required for {operation}")))
    }
}
