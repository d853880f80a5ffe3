use std::sync::Arc;

use tower_http::cors::CorsLayer;

use hr_onboarding::config::Config;
use hr_onboarding::onboarding::{
    LifecycleEngine, LogNotifier, OnboardingRouteState, onboarding_routes,
};
use hr_onboarding::store::LibSqlStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    eprintln!("HR Onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding", config.port);

    // ── Database ─────────────────────────────────────────────────────────
    let db_path = std::path::Path::new(&config.db_path);
    let store = Arc::new(LibSqlStore::new_local(db_path).await.unwrap_or_else(|e| {
        eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
        std::process::exit(1);
    }));
    eprintln!("   Database: {}", config.db_path);

    // ── Engine ───────────────────────────────────────────────────────────
    let engine = Arc::new(
        LifecycleEngine::new(store, Arc::new(LogNotifier))
            .with_write_retries(config.write_retries),
    );

    // ── HTTP server ──────────────────────────────────────────────────────
    let app = onboarding_routes(OnboardingRouteState { engine }).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Onboarding server started");
    axum::serve(listener, app).await?;

    Ok(())
}
