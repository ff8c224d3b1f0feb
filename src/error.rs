// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages.
/// Every business-rule violation is recovered at the operation boundary and
/// turned into one of these; nothing propagates as an unhandled fault.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    Validation(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Validation(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Stable machine-readable code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "message": self.message(),
            "code": self.error_code(),
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

/// Translate persistence failures to the nearest taxonomy entry: unique
/// constraint violations are business conflicts, everything else surfaces
/// as a logged generic internal error.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return ApiError::conflict("Resource already exists");
            }
        }
        tracing::error!("SQLx error: {}", err);
        ApiError::internal_server_error("An error occurred while processing your request")
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        use crate::database::manager::DatabaseError;
        match err {
            DatabaseError::InvalidSchemaName(name) => {
                tracing::warn!("Rejected schema name: {}", name);
                ApiError::bad_request("Invalid tenant identifier")
            }
            DatabaseError::ConfigMissing(key) => {
                tracing::error!("Missing configuration: {}", key);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::InvalidDatabaseUrl => {
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => sqlx_err.into(),
        }
    }
}

impl From<crate::services::tenant_service::TenantError> for ApiError {
    fn from(err: crate::services::tenant_service::TenantError) -> Self {
        use crate::services::tenant_service::TenantError;
        match err {
            TenantError::NotFound => ApiError::not_found("Tenant not found"),
            TenantError::Inactive => ApiError::forbidden("Tenant is deactivated"),
            TenantError::DuplicateName(name) => {
                ApiError::conflict(format!("Tenant name already exists: {}", name))
            }
            TenantError::InvalidName(msg) => ApiError::validation(msg),
            TenantError::Hash(err) => {
                tracing::error!("Password hash error: {}", err);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            TenantError::Database(sqlx_err) => sqlx_err.into(),
            TenantError::Manager(db_err) => db_err.into(),
        }
    }
}

impl From<crate::services::auth_service::AuthError> for ApiError {
    fn from(err: crate::services::auth_service::AuthError) -> Self {
        use crate::services::auth_service::AuthError;
        match err {
            AuthError::EmailNotFound => ApiError::unauthorized("Email not found"),
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid credentials"),
            AuthError::AccountInactive => ApiError::forbidden("Account is deactivated"),
            AuthError::TenantNotFound => {
                ApiError::not_found("Tenant not found or inactive")
            }
            AuthError::TenantInactive => ApiError::forbidden("Tenant is deactivated"),
            AuthError::Hash(err) => {
                tracing::error!("Password hash error: {}", err);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            AuthError::Token(err) => {
                tracing::error!("JWT generation error: {}", err);
                ApiError::internal_server_error("Failed to issue session token")
            }
            AuthError::Database(sqlx_err) => sqlx_err.into(),
            AuthError::Manager(db_err) => db_err.into(),
        }
    }
}

impl From<crate::services::attendance_service::AttendanceError> for ApiError {
    fn from(err: crate::services::attendance_service::AttendanceError) -> Self {
        use crate::services::attendance_service::AttendanceError;
        match err {
            AttendanceError::UserNotFound => ApiError::not_found("User not found"),
            AttendanceError::FaceVerificationRequired(action) => {
                ApiError::bad_request(format!("Face verification required for {}", action))
            }
            AttendanceError::AlreadyClockedIn => {
                ApiError::conflict("Attendance already recorded for today")
            }
            AttendanceError::NoActiveSession => {
                ApiError::bad_request("No active check-in found or already clocked out")
            }
            AttendanceError::ActiveBreakMustEndFirst => {
                ApiError::conflict("Please end your break before clocking out")
            }
            AttendanceError::MustClockInFirst => {
                ApiError::bad_request("You must clock in first before starting a break")
            }
            AttendanceError::BreakAlreadyActive => {
                ApiError::conflict("You already have an active break")
            }
            AttendanceError::BreakLimitReached(max) => ApiError::conflict(format!(
                "You have reached the maximum break time of {} minutes for today",
                max
            )),
            AttendanceError::NoActiveBreak => ApiError::bad_request("No active break found"),
            AttendanceError::Database(sqlx_err) => sqlx_err.into(),
        }
    }
}

impl From<crate::services::payroll_service::PayrollError> for ApiError {
    fn from(err: crate::services::payroll_service::PayrollError) -> Self {
        use crate::services::payroll_service::PayrollError;
        match err {
            PayrollError::UserNotFound => ApiError::not_found("User not found"),
            PayrollError::NotFound => ApiError::not_found("Payroll not found"),
            PayrollError::Database(sqlx_err) => sqlx_err.into(),
        }
    }
}

impl From<crate::services::task_service::TaskError> for ApiError {
    fn from(err: crate::services::task_service::TaskError) -> Self {
        use crate::services::task_service::TaskError;
        match err {
            TaskError::NotFound => ApiError::not_found("Task not found"),
            TaskError::Forbidden(msg) => ApiError::forbidden(msg),
            TaskError::Validation(msg) => ApiError::validation(msg),
            TaskError::Database(sqlx_err) => sqlx_err.into(),
        }
    }
}

impl From<crate::services::user_service::UserError> for ApiError {
    fn from(err: crate::services::user_service::UserError) -> Self {
        use crate::services::user_service::UserError;
        match err {
            UserError::NotFound => ApiError::not_found("User not found"),
            UserError::DuplicateEmail => ApiError::conflict("Email already registered"),
            UserError::FaceNotRegistered => ApiError::bad_request("Face not registered"),
            UserError::InvalidDescriptor => {
                ApiError::validation("Face descriptor is malformed or has the wrong length")
            }
            UserError::Hash(err) => {
                tracing::error!("Password hash error: {}", err);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            UserError::Database(sqlx_err) => sqlx_err.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::conflict("x").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn json_body_carries_stable_code() {
        let body = ApiError::forbidden("Tenant is deactivated").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(body["message"], "Tenant is deactivated");
    }
}
