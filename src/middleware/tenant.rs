use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;

use crate::error::ApiError;
use crate::services::tenant_service::TenantService;
use crate::AppState;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Tenant partition pool, injected once the binder has resolved the header
#[derive(Clone)]
pub struct TenantPool(pub PgPool);

/// Resolved tenant identity for the current request
#[derive(Clone, Debug)]
pub struct TenantContext {
    pub tenant_id: i32,
    pub tenant_name: String,
    pub schema_name: String,
}

/// Strict tenant binder: a missing or unparsable X-Tenant-ID header fails
/// the request before any handler runs, an unknown tenant is 404 and a
/// deactivated one 403.
pub async fn require_tenant_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let tenant_id = parse_tenant_header(&headers)?;

    let directory = TenantService::new(state.partitions.clone());
    let tenant = directory.resolve(tenant_id).await?;

    let pool = state.partitions.tenant_pool(&tenant.schema_name).await?;

    tracing::debug!("Tenant bound: {} ({})", tenant.name, tenant.schema_name);

    request.extensions_mut().insert(TenantContext {
        tenant_id: tenant.id,
        tenant_name: tenant.name,
        schema_name: tenant.schema_name,
    });
    request.extensions_mut().insert(TenantPool(pool));

    Ok(next.run(request).await)
}

fn parse_tenant_header(headers: &HeaderMap) -> Result<i32, ApiError> {
    let raw = headers
        .get(TENANT_HEADER)
        .ok_or_else(|| ApiError::bad_request("Missing X-Tenant-ID header"))?;

    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
        .ok_or_else(|| ApiError::bad_request("X-Tenant-ID header must be a numeric tenant id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_parses_numeric_id() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("42"));
        assert_eq!(parse_tenant_header(&headers).unwrap(), 42);
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(parse_tenant_header(&HeaderMap::new()).is_err());
    }

    #[test]
    fn garbage_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("acme"));
        assert!(parse_tenant_header(&headers).is_err());
    }
}
