use serde::Serialize;
use tracing::warn;

use crate::auth::{self, password, Claims};
use crate::database::manager::{DatabaseError, PartitionManager};
use crate::database::models::super_admin::SuperAdmin;
use crate::database::models::tenant::Tenant;
use crate::database::models::user::User;
use crate::services::tenant_service::{TenantError, TenantService};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email not found")]
    EmailNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("Tenant not found")]
    TenantNotFound,

    #[error("Tenant is deactivated")]
    TenantInactive,

    #[error("Password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Token(#[from] auth::JwtError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Partition manager error: {0}")]
    Manager(#[from] DatabaseError),
}

/// Successful login payload: token plus the user/tenant details the mobile
/// client renders
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<SessionTenant>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_super_admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: String,
    pub photo: Option<String>,
    pub face_registered: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTenant {
    pub id: i32,
    pub name: String,
}

/// A tenant the caller may pick during disambiguation (id + display name
/// only; no credential material)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantCandidate {
    pub tenant_id: i32,
    pub tenant_name: String,
}

/// Typed outcome of the two-phase login. Email is only unique per tenant,
/// so a multi-tenant email match defers password verification to an
/// explicit follow-up call with a chosen tenant id.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LoginOutcome {
    Authenticated(Session),
    TenantSelectionRequired { tenants: Vec<TenantCandidate> },
}

struct TenantMatch {
    tenant: Tenant,
    user: User,
}

/// Decide the auto-login path from the per-tenant matches. Pure so the
/// disambiguation rule is testable without a database: zero matches fail,
/// one match proceeds to verification, several return the candidate list
/// with no password checked.
fn disambiguate(mut matches: Vec<TenantMatch>) -> Result<MatchOutcome, AuthError> {
    match matches.len() {
        0 => Err(AuthError::EmailNotFound),
        1 => Ok(MatchOutcome::Single(matches.remove(0))),
        _ => Ok(MatchOutcome::Ambiguous(
            matches
                .into_iter()
                .map(|m| TenantCandidate {
                    tenant_id: m.tenant.id,
                    tenant_name: m.tenant.name,
                })
                .collect(),
        )),
    }
}

enum MatchOutcome {
    Single(TenantMatch),
    Ambiguous(Vec<TenantCandidate>),
}

/// Cross-tenant auth resolver: super-admin registry first, then an email
/// sweep across every active tenant partition.
pub struct AuthService {
    partitions: PartitionManager,
}

impl AuthService {
    pub fn new(partitions: PartitionManager) -> Self {
        Self { partitions }
    }

    pub async fn auto_login(&self, email: &str, plaintext: &str) -> Result<LoginOutcome, AuthError> {
        // Super admins are exclusive: a matching email never falls through
        // to the tenant sweep, even on a wrong password.
        if let Some(super_admin) = self.find_super_admin(email).await? {
            if !password::verify(plaintext, &super_admin.password).await? {
                return Err(AuthError::InvalidCredentials);
            }
            return Ok(LoginOutcome::Authenticated(
                self.super_admin_session(&super_admin)?,
            ));
        }

        let directory = TenantService::new(self.partitions.clone());
        let tenants = directory.list().await.map_err(tenant_to_auth)?;

        let mut matches = Vec::new();
        for tenant in tenants.into_iter().filter(|t| t.is_active) {
            match self.find_user_in(&tenant, email).await {
                Ok(Some(user)) => matches.push(TenantMatch { tenant, user }),
                Ok(None) => {}
                // A half-provisioned or unreachable partition must not block
                // login against the others
                Err(err) => {
                    warn!("Skipping tenant {} during login sweep: {}", tenant.id, err);
                }
            }
        }

        match disambiguate(matches)? {
            MatchOutcome::Single(found) => {
                let session = self
                    .verify_and_issue(found.user, found.tenant, plaintext)
                    .await?;
                Ok(LoginOutcome::Authenticated(session))
            }
            MatchOutcome::Ambiguous(tenants) => {
                Ok(LoginOutcome::TenantSelectionRequired { tenants })
            }
        }
    }

    /// Phase two of the disambiguated login: verify against one explicit
    /// tenant's stored hash.
    pub async fn login_with_tenant(
        &self,
        email: &str,
        plaintext: &str,
        tenant_id: i32,
    ) -> Result<Session, AuthError> {
        let directory = TenantService::new(self.partitions.clone());
        let tenant = directory.resolve(tenant_id).await.map_err(tenant_to_auth)?;

        let user = self
            .find_user_in(&tenant, email)
            .await?
            .ok_or(AuthError::EmailNotFound)?;

        self.verify_and_issue(user, tenant, plaintext).await
    }

    /// Direct login against an already-bound tenant (X-Tenant-ID flow)
    pub async fn login_bound(
        &self,
        pool: &sqlx::PgPool,
        tenant: &Tenant,
        email: &str,
        plaintext: &str,
    ) -> Result<Session, AuthError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.verify_and_issue(user, tenant.clone(), plaintext).await
    }

    pub async fn super_admin_login(
        &self,
        email: &str,
        plaintext: &str,
    ) -> Result<Session, AuthError> {
        let super_admin = self
            .find_super_admin(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify(plaintext, &super_admin.password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        self.super_admin_session(&super_admin)
    }

    /// Every tenant-bound session goes through here, including the
    /// single-match auto-login path: the stored hash is always checked
    /// against the submitted plaintext before a token is minted.
    async fn verify_and_issue(
        &self,
        user: User,
        tenant: Tenant,
        plaintext: &str,
    ) -> Result<Session, AuthError> {
        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }
        issue_user_session(user, tenant, plaintext).await
    }

    fn super_admin_session(&self, super_admin: &SuperAdmin) -> Result<Session, AuthError> {
        let claims = Claims::for_super_admin(super_admin.id, super_admin.email.clone());
        let token = auth::generate_jwt(&claims)?;
        Ok(Session {
            token,
            user: SessionUser {
                id: super_admin.id,
                email: super_admin.email.clone(),
                name: super_admin.name.clone(),
                role: "SUPER_ADMIN".to_string(),
                photo: None,
                face_registered: false,
            },
            tenant: None,
            is_super_admin: true,
        })
    }

    async fn find_super_admin(&self, email: &str) -> Result<Option<SuperAdmin>, AuthError> {
        let pool = self.partitions.public_pool().await?;
        let row = sqlx::query_as::<_, SuperAdmin>("SELECT * FROM super_admins WHERE email = $1")
            .bind(email)
            .fetch_optional(&pool)
            .await?;
        Ok(row)
    }

    async fn find_user_in(&self, tenant: &Tenant, email: &str) -> Result<Option<User>, AuthError> {
        let pool = self.partitions.tenant_pool(&tenant.schema_name).await?;
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&pool)
            .await?;
        Ok(user)
    }
}

/// Verify the password against the stored hash, then mint a tenant-bound
/// session.
async fn issue_user_session(
    user: User,
    tenant: Tenant,
    plaintext: &str,
) -> Result<Session, AuthError> {
    if !password::verify(plaintext, &user.password).await? {
        return Err(AuthError::InvalidCredentials);
    }

    let role = serde_json::to_value(user.role)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "USER".to_string());

    let claims = Claims::for_user(user.id, user.email.clone(), role.clone(), tenant.id);
    let token = auth::generate_jwt(&claims)?;

    Ok(Session {
        token,
        user: SessionUser {
            id: user.id,
            email: user.email,
            name: user.name,
            role,
            photo: user.photo,
            face_registered: user.face_registered,
        },
        tenant: Some(SessionTenant {
            id: tenant.id,
            name: tenant.name,
        }),
        is_super_admin: false,
    })
}

fn tenant_to_auth(err: TenantError) -> AuthError {
    match err {
        TenantError::NotFound => AuthError::TenantNotFound,
        TenantError::Inactive => AuthError::TenantInactive,
        TenantError::Database(e) => AuthError::Database(e),
        TenantError::Manager(e) => AuthError::Manager(e),
        other => {
            warn!("Unexpected tenant error during login: {}", other);
            AuthError::TenantNotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::database::models::user::{Role, SalaryType};

    fn tenant(id: i32, name: &str) -> Tenant {
        Tenant {
            id,
            name: name.to_string(),
            schema_name: format!("tenant_{}", id),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn user(id: i32, email: &str) -> User {
        User {
            id,
            email: email.to_string(),
            password: "$2b$12$not-a-real-hash".to_string(),
            name: "Someone".to_string(),
            role: Role::User,
            photo: None,
            face_descriptor: None,
            face_registered: false,
            is_active: true,
            salary_type: SalaryType::Monthly,
            salary: 0.0,
            start_work_time: "09:00".to_string(),
            late_penalty: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn no_match_is_email_not_found() {
        assert!(matches!(
            disambiguate(vec![]),
            Err(AuthError::EmailNotFound)
        ));
    }

    #[test]
    fn single_match_proceeds_to_verification() {
        let outcome = disambiguate(vec![TenantMatch {
            tenant: tenant(1, "Acme"),
            user: user(10, "a@b.co"),
        }])
        .unwrap();
        assert!(matches!(outcome, MatchOutcome::Single(m) if m.tenant.id == 1 && m.user.id == 10));
    }

    #[test]
    fn multiple_matches_return_candidates_without_credentials() {
        let outcome = disambiguate(vec![
            TenantMatch {
                tenant: tenant(1, "Acme"),
                user: user(10, "a@b.co"),
            },
            TenantMatch {
                tenant: tenant(2, "Globex"),
                user: user(44, "a@b.co"),
            },
        ])
        .unwrap();

        let MatchOutcome::Ambiguous(candidates) = outcome else {
            panic!("expected ambiguous outcome");
        };
        assert_eq!(
            candidates,
            vec![
                TenantCandidate {
                    tenant_id: 1,
                    tenant_name: "Acme".to_string()
                },
                TenantCandidate {
                    tenant_id: 2,
                    tenant_name: "Globex".to_string()
                },
            ]
        );
        // Candidate payload carries ids and names only; password hashes
        // never leave the per-tenant match structs
        let serialized = serde_json::to_value(&candidates).unwrap();
        assert!(serialized.to_string().find("password").is_none());
    }

    fn user_with_password(id: i32, email: &str, plaintext: &str) -> User {
        let mut u = user(id, email);
        u.password = bcrypt::hash(plaintext, 4).unwrap();
        u
    }

    #[tokio::test]
    async fn single_match_login_rejects_wrong_password() {
        let svc = AuthService::new(PartitionManager::new());
        let u = user_with_password(10, "a@b.co", "correct-horse");

        let err = svc
            .verify_and_issue(u, tenant(1, "Acme"), "battery-staple")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn single_match_login_accepts_the_stored_password() {
        let svc = AuthService::new(PartitionManager::new());
        let u = user_with_password(10, "a@b.co", "correct-horse");

        let session = svc
            .verify_and_issue(u, tenant(1, "Acme"), "correct-horse")
            .await
            .unwrap();
        assert!(!session.token.is_empty());
        assert_eq!(session.user.id, 10);
        assert_eq!(session.tenant.as_ref().map(|t| t.id), Some(1));
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in_even_with_the_right_password() {
        let svc = AuthService::new(PartitionManager::new());
        let mut u = user_with_password(10, "a@b.co", "correct-horse");
        u.is_active = false;

        let err = svc
            .verify_and_issue(u, tenant(1, "Acme"), "correct-horse")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountInactive));
    }
}
