use funnel_metrics::api::AppState;
use funnel_metrics::config::Config;
use funnel_metrics::generate::SessionGenerator;
use funnel_metrics::server;
use funnel_metrics::store::SessionStore;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funnel_metrics=info,tower_http=info".into()),
        )
        .init();

    // Load configuration
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(std::path::Path::new));

    tracing::info!(
        host = %config.host,
        port = config.port,
        demo_sessions = config.demo_sessions,
        "Starting Funnel Metrics"
    );

    let mut generator = SessionGenerator::new(config.demo_seed);
    let store = SessionStore::new();

    // Seed the demo dataset
    if config.demo_sessions > 0 {
        let seeded = generator.batch(config.demo_sessions, chrono::Utc::now());
        tracing::info!(count = seeded.len(), "Seeded demo sessions");
        store.replace(seeded);
    }

    // Periodic demo batches simulate a live producer
    if config.demo_interval_secs > 0 && config.demo_batch_size > 0 {
        let batch_store = store.clone();
        let batch_size = config.demo_batch_size;
        let interval_secs = config.demo_interval_secs;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                let batch = generator.batch(batch_size, chrono::Utc::now());
                batch_store.append(batch);
                tracing::debug!(
                    count = batch_size,
                    total = batch_store.len(),
                    "Demo batch appended"
                );
            }
        });
    }

    let demo_enabled = config.demo_sessions > 0 || config.demo_interval_secs > 0;
    let state = Arc::new(AppState::new(store, config.batch_limit, demo_enabled));

    let app = server::build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app).await.expect("Server error");
}
