//! Incident log endpoints

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::AppState;
use crate::store::AlertRecord;

const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    limit: Option<usize>,
}

/// Most recent alerts, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Json<Vec<AlertRecord>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.alert_log().recent(limit).await?))
}

/// Bulk-clear the alert log
pub async fn clear(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.alert_log().clear().await?;
    tracing::warn!(
        path = %state.alert_log().path().display(),
        "Alert log cleared through status API"
    );
    Ok(StatusCode::NO_CONTENT)
}
