pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;

/// Session token claims. `tenant_id` is absent for super admins, who operate
/// outside any tenant partition. The tenant id embedded here is informational;
/// tenant-scoped requests still carry an explicit X-Tenant-ID header that the
/// tenant binder validates independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i32>,
    #[serde(default)]
    pub is_super_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_user(user_id: i32, email: String, role: String, tenant_id: i32) -> Self {
        Self::new(user_id, email, role, Some(tenant_id), false)
    }

    pub fn for_super_admin(id: i32, email: String) -> Self {
        Self::new(id, email, "SUPER_ADMIN".to_string(), None, true)
    }

    fn new(
        sub: i32,
        email: String,
        role: String,
        tenant_id: Option<i32>,
        is_super_admin: bool,
    ) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub,
            email,
            role,
            tenant_id,
            is_super_admin,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    TokenValidation(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::TokenValidation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_tenant_claims() {
        let claims = Claims::for_user(7, "a@b.co".into(), "ADMIN".into(), 3);
        let token = generate_jwt(&claims).unwrap();
        let decoded = validate_jwt(&token).unwrap();
        assert_eq!(decoded.sub, 7);
        assert_eq!(decoded.tenant_id, Some(3));
        assert!(!decoded.is_super_admin);
    }

    #[test]
    fn super_admin_claims_have_no_tenant() {
        let claims = Claims::for_super_admin(1, "root@example.com".into());
        let token = generate_jwt(&claims).unwrap();
        let decoded = validate_jwt(&token).unwrap();
        assert_eq!(decoded.tenant_id, None);
        assert!(decoded.is_super_admin);
        assert_eq!(decoded.role, "SUPER_ADMIN");
    }
}
