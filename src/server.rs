use crate::api::sessions::submit_sessions;
use crate::api::{stats, AppState};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Permissive CORS for submission (the producer may run anywhere)
    let submission_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    // Stats are read-only; any dashboard origin may fetch them
    let stats_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    let stats_routes = Router::new()
        .route("/stats/funnel", get(stats::get_funnel))
        .route("/stats/bottlenecks", get(stats::get_bottlenecks))
        .route(
            "/stats/breakdown/devices",
            get(stats::get_devices_breakdown),
        )
        .route(
            "/stats/breakdown/sources",
            get(stats::get_sources_breakdown),
        )
        .route("/stats/summary/devices", get(stats::get_devices_summary))
        .route("/stats/summary/sources", get(stats::get_sources_summary))
        .route("/stats/overview", get(stats::get_overview))
        .layer(stats_cors);

    // Submission with permissive CORS and a 4 MB body limit
    let submission_routes = Router::new()
        .route("/sessions", post(submit_sessions))
        .layer(DefaultBodyLimit::max(4_194_304))
        .layer(submission_cors);

    let api_routes = Router::new().merge(submission_routes).merge(stats_routes);

    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api", api_routes)
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(30),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health — Simple health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

/// GET /health/detailed — Detailed health check with system info.
async fn detailed_health_check(
    State(state): State<Arc<AppState>>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.store.len(),
        "events": state.store.event_count(),
        "demo_enabled": state.demo_enabled,
    }))
}

/// GET /metrics — Prometheus-compatible metrics endpoint.
async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> ([(header::HeaderName, &'static str); 1], String) {
    use std::fmt::Write;
    use std::sync::atomic::Ordering;

    let sessions = state.store.len();
    let events = state.store.event_count();
    let submitted = state.sessions_submitted_total.load(Ordering::Relaxed);
    let demo_enabled = u8::from(state.demo_enabled);

    let mut out = String::with_capacity(512);
    let _ = writeln!(
        out,
        "# HELP funnel_sessions Sessions in the current snapshot"
    );
    let _ = writeln!(out, "# TYPE funnel_sessions gauge");
    let _ = writeln!(out, "funnel_sessions {sessions}");
    let _ = writeln!(
        out,
        "# HELP funnel_events Stage events in the current snapshot"
    );
    let _ = writeln!(out, "# TYPE funnel_events gauge");
    let _ = writeln!(out, "funnel_events {events}");
    let _ = writeln!(
        out,
        "# HELP funnel_sessions_submitted_total Sessions accepted via the API since startup"
    );
    let _ = writeln!(out, "# TYPE funnel_sessions_submitted_total counter");
    let _ = writeln!(out, "funnel_sessions_submitted_total {submitted}");
    let _ = writeln!(
        out,
        "# HELP funnel_demo_enabled Whether the demo generator is running"
    );
    let _ = writeln!(out, "# TYPE funnel_demo_enabled gauge");
    let _ = writeln!(out, "funnel_demo_enabled {demo_enabled}");

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], out)
}
