pub mod auth;
pub mod response;
pub mod tenant;

pub use response::ApiResponse;

pub use auth::{jwt_auth_middleware, require_admin, require_leader_or_admin, require_super_admin, AuthUser};
pub use tenant::{require_tenant_middleware, TenantContext, TenantPool};
