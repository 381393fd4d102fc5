use axum::Extension;

use crate::middleware::{ApiResponse, ApiResult, TenantContext};

/// GET /api/me - the caller's tenant context
pub async fn show(Extension(ctx): Extension<TenantContext>) -> ApiResult<TenantContext> {
    Ok(ApiResponse::success(ctx))
}
