use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;
use super::tenant::TenantPool;

/// Authenticated caller context extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: String,
    pub tenant_id: Option<i32>,
    pub is_super_admin: bool,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "ADMIN" || self.is_super_admin
    }

    pub fn is_leader_or_admin(&self) -> bool {
        self.role == "LEADER" || self.is_admin()
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            tenant_id: claims.tenant_id,
            is_super_admin: claims.is_super_admin,
        }
    }
}

/// Bearer-token middleware. When a tenant pool is already bound upstream,
/// the token's account is also checked against that partition so a revoked
/// or deactivated employee cannot keep using an old token.
pub async fn jwt_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;
    let claims = validate_jwt(&token).map_err(|e| {
        tracing::debug!("Token rejected: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    let auth_user = AuthUser::from(claims);

    if !auth_user.is_super_admin {
        if let Some(TenantPool(pool)) = request.extensions().get::<TenantPool>() {
            let active: Option<(bool,)> =
                sqlx::query_as("SELECT is_active FROM users WHERE id = $1")
                    .bind(auth_user.user_id)
                    .fetch_optional(pool)
                    .await?;
            match active {
                Some((true,)) => {}
                Some((false,)) => return Err(ApiError::forbidden("Account is deactivated")),
                None => return Err(ApiError::unauthorized("Account no longer exists")),
            }
        }
    }

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

pub async fn require_super_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = current_user(&request)?;
    if !auth_user.is_super_admin {
        return Err(ApiError::forbidden("Super admin access required"));
    }
    Ok(next.run(request).await)
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = current_user(&request)?;
    if !auth_user.is_admin() {
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(next.run(request).await)
}

pub async fn require_leader_or_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = current_user(&request)?;
    if !auth_user.is_leader_or_admin() {
        return Err(ApiError::forbidden("Leader or admin access required"));
    }
    Ok(next.run(request).await)
}

fn current_user(request: &Request) -> Result<&AuthUser, ApiError> {
    request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err(ApiError::unauthorized("Empty bearer token")),
        None => Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user_with_role(role: &str, is_super_admin: bool) -> AuthUser {
        AuthUser {
            user_id: 1,
            email: "a@b.co".to_string(),
            role: role.to_string(),
            tenant_id: Some(1),
            is_super_admin,
        }
    }

    #[test]
    fn role_helpers() {
        assert!(user_with_role("ADMIN", false).is_admin());
        assert!(user_with_role("LEADER", false).is_leader_or_admin());
        assert!(!user_with_role("LEADER", false).is_admin());
        assert!(!user_with_role("USER", false).is_leader_or_admin());
        assert!(user_with_role("SUPER_ADMIN", true).is_admin());
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def");

        let mut bad = HeaderMap::new();
        bad.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&bad).is_err());
        assert!(extract_bearer_token(&HeaderMap::new()).is_err());
    }
}
