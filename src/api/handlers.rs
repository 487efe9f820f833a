use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;

use crate::identity::{resolve_visitor, visitor_cookie};
use crate::ledger::Ledger;
use crate::models::VisitStats;

pub const STATS_UPDATE_FAILED: &str = "stats_update_failed";
pub const STATS_READ_FAILED: &str = "stats_read_failed";

pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitResponse {
    pub ok: bool,
    pub total_visits: u64,
    pub unique_visitors: u64,
    pub new_visitor: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub backend: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn server_error(code: &'static str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            ok: false,
            error: code,
        }),
    )
}

/// Record a visit and (re)issue the visitor cookie
pub async fn record_visit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<VisitResponse>), ApiError> {
    let visitor = resolve_visitor(&jar, state.ledger.as_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to resolve visitor");
            server_error(STATS_UPDATE_FAILED)
        })?;

    let outcome = state
        .ledger
        .record_visit(&visitor.id)
        .await
        .map_err(|e| {
            tracing::error!(visitor_id = %visitor.id, error = %e, "failed to record visit");
            server_error(STATS_UPDATE_FAILED)
        })?;

    tracing::debug!(
        visitor_id = %visitor.id,
        new_candidate = visitor.is_new_candidate,
        new_visitor = outcome.is_new,
        total_visits = outcome.stats.total_visits,
        "visit recorded"
    );

    let body = VisitResponse {
        ok: true,
        total_visits: outcome.stats.total_visits,
        unique_visitors: outcome.stats.unique_visitors,
        new_visitor: outcome.is_new,
    };

    Ok((jar.add(visitor_cookie(visitor.id)), Json(body)))
}

/// Current totals
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VisitStats>, ApiError> {
    match state.ledger.read_stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            tracing::error!(error = %e, "failed to read stats");
            Err(server_error(STATS_READ_FAILED))
        }
    }
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        backend: state.ledger.backend(),
    })
}
