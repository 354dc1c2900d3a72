use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{error::{AppError, Result}, state::AppState};

/// Serves the security report: lifetime anomaly count, live session count
/// and the most recent ledger entries. Instructor-only at the router level.
#[axum::debug_handler]
pub async fn security_report(State(state): State<AppState>) -> Result<Response> {
    let summary = state.ledger.summary(state.registry.active_count());

    let body = sonic_rs::to_string(&summary)
        .map_err(|e| AppError::Internal(format!("Serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}
