use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::ledger::Ledger;

use super::cors::cors_middleware;
use super::handlers::{get_stats, health_check, record_visit, AppState};
use super::static_files::static_site;

pub fn create_router(ledger: Arc<dyn Ledger>, config: &Config) -> Router {
    let state = Arc::new(AppState { ledger });
    let cors = Arc::new(config.cors.clone());

    let api_routes = Router::new()
        .route("/api/visit", post(record_visit))
        .route("/api/stats", get(get_stats))
        .route("/api/health", get(health_check))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .fallback_service(static_site(&config.frontend.static_dir))
        .layer(middleware::from_fn_with_state(cors, cors_middleware))
        .layer(TraceLayer::new_for_http())
}
