//! Current status of every service, as last persisted by the monitor

use axum::{Json, extract::State};
use std::collections::BTreeMap;

use crate::error::AppResult;
use crate::handlers::AppState;
use crate::store::{StatusSnapshot, StatusStore};

pub async fn handler(
    State(state): State<AppState>,
) -> AppResult<Json<BTreeMap<String, StatusSnapshot>>> {
    let snapshots = StatusStore::load(&state.config().storage.status_file).await?;
    Ok(Json(snapshots))
}
