use axum::extract::State;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use database::manager::PartitionManager;
use middleware::auth::{
    jwt_auth_middleware, require_admin, require_leader_or_admin, require_super_admin,
};
use middleware::tenant::require_tenant_middleware;

/// Shared application state handed to every router and middleware
#[derive(Clone)]
pub struct AppState {
    pub partitions: PartitionManager,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(super_admin_routes())
        .merge(tenant_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unauthenticated surface: cross-tenant login and the tenant picker
fn public_routes() -> Router<AppState> {
    use handlers::{auth, tenants};

    Router::new()
        .route("/api/auth/login", post(auth::auto_login))
        .route("/api/auth/login-tenant", post(auth::login_with_tenant))
        .route("/api/tenants", get(tenants::list_active))
}

fn super_admin_routes() -> Router<AppState> {
    use handlers::super_admin;

    let protected = Router::new()
        .route(
            "/api/super-admin/tenants",
            get(super_admin::list_tenants).post(super_admin::create_tenant),
        )
        .route(
            "/api/super-admin/tenants/:id/activate",
            patch(super_admin::activate_tenant),
        )
        .route(
            "/api/super-admin/tenants/:id/deactivate",
            patch(super_admin::deactivate_tenant),
        )
        .route(
            "/api/super-admin/tenants/:id",
            delete(super_admin::delete_tenant),
        )
        .route_layer(axum::middleware::from_fn(require_super_admin))
        .route_layer(axum::middleware::from_fn(jwt_auth_middleware));

    Router::new()
        .route("/api/super-admin/login", post(super_admin::login))
        .merge(protected)
}

/// Everything under a tenant partition. The binder middleware resolves the
/// X-Tenant-ID header first; the JWT layer then authenticates against that
/// partition. Only the direct login route skips the JWT check.
fn tenant_routes(state: AppState) -> Router<AppState> {
    use handlers::users;

    let login = Router::new().route("/api/users/login", post(users::login));

    let protected = Router::new()
        .merge(user_routes())
        .merge(attendance_routes())
        .merge(break_routes())
        .merge(task_routes())
        .merge(payroll_routes())
        .merge(face_routes())
        .merge(config_routes())
        .route_layer(axum::middleware::from_fn(jwt_auth_middleware));

    login
        .merge(protected)
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            require_tenant_middleware,
        ))
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    let admin = Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route_layer(axum::middleware::from_fn(require_admin));

    Router::new()
        .route("/api/users/profile", get(users::profile))
        .merge(admin)
}

fn attendance_routes() -> Router<AppState> {
    use handlers::attendance;

    let supervision = Router::new()
        .route("/api/attendance/all-today", get(attendance::all_today))
        .route("/api/attendance/report", get(attendance::report))
        .route_layer(axum::middleware::from_fn(require_leader_or_admin));

    Router::new()
        .route("/api/attendance/clock-in", post(attendance::clock_in))
        .route("/api/attendance/clock-out", post(attendance::clock_out))
        .route("/api/attendance/today", get(attendance::today))
        .route("/api/attendance/history", get(attendance::history))
        .route("/api/attendance/statistics", get(attendance::statistics))
        .merge(supervision)
}

fn break_routes() -> Router<AppState> {
    use handlers::breaks;

    Router::new()
        .route("/api/break/start", post(breaks::start))
        .route("/api/break/end", post(breaks::end))
        .route("/api/break/today", get(breaks::today))
        .route("/api/break/history", get(breaks::history))
}

fn task_routes() -> Router<AppState> {
    use handlers::tasks;

    let supervision = Router::new()
        .route("/api/tasks/all", get(tasks::list))
        .route_layer(axum::middleware::from_fn(require_leader_or_admin));

    Router::new()
        .route("/api/tasks", post(tasks::create))
        .route("/api/tasks/my", get(tasks::my_tasks))
        .route("/api/tasks/:id/status", patch(tasks::update_status))
        .route("/api/tasks/:id", delete(tasks::delete))
        .merge(supervision)
}

fn payroll_routes() -> Router<AppState> {
    use handlers::payroll;

    let admin = Router::new()
        .route("/api/payroll/generate", post(payroll::generate))
        .route("/api/payroll", get(payroll::list))
        .route_layer(axum::middleware::from_fn(require_admin));

    // delete checks the admin role in the handler; the path shares its
    // method router with the owner-visible get
    Router::new()
        .route("/api/payroll/my", get(payroll::my_payrolls))
        .route("/api/payroll/:id", get(payroll::get).delete(payroll::delete))
        .merge(admin)
}

fn face_routes() -> Router<AppState> {
    use handlers::faces;

    Router::new()
        .route("/api/face/register", post(faces::register))
        .route("/api/face/verify", post(faces::verify))
        .route("/api/face/status", get(faces::status))
}

fn config_routes() -> Router<AppState> {
    use handlers::company;

    // update checks the admin role in the handler
    Router::new().route("/api/config", get(company::get).put(company::update))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Timeclock API",
            "version": version,
            "description": "Multi-tenant attendance and payroll backend",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/api/auth/login, /api/auth/login-tenant (public)",
                "tenants": "/api/tenants (public - active tenant picker)",
                "super_admin": "/api/super-admin/* (super admin)",
                "users": "/api/users/* (tenant, X-Tenant-ID header)",
                "attendance": "/api/attendance/* (tenant)",
                "breaks": "/api/break/* (tenant)",
                "tasks": "/api/tasks/* (tenant)",
                "payroll": "/api/payroll/* (tenant)",
                "face": "/api/face/* (tenant)",
                "config": "/api/config (tenant)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.partitions.health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
