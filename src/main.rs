use timeclock_api::database::manager::PartitionManager;
use timeclock_api::services::tenant_service::TenantService;
use timeclock_api::{app, config, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting Timeclock API in {:?} mode", config.environment);

    let partitions = PartitionManager::new();

    // Prepare the shared directory tables. A missing database at boot is
    // logged but not fatal; /health reports the degraded state.
    if let Err(e) = TenantService::new(partitions.clone())
        .ensure_directory_schema()
        .await
    {
        tracing::warn!("Could not prepare tenant directory: {}", e);
    }

    let state = AppState { partitions };
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("TIMECLOCK_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("Timeclock API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
