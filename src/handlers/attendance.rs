use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::session::AuthSession,
    models::user::Role,
    security::engine::{RejectReason, Verdict},
    security::store::ClientMeta,
    services::attendance as attendance_service,
    state::AppState,
};

/// The request payload for redeeming a scanned QR code.
#[derive(Deserialize)]
pub struct RedeemRequest {
    pub qr_data: String,
}

/// Redeems a scanned QR payload for the logged-in student.
///
/// Rejections are ordinary outcomes: the client gets a 200 with
/// `success: false` and a reason it can show as-is. Only a store outage is
/// surfaced as a server fault.
#[axum::debug_handler]
pub async fn redeem(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(session): Extension<AuthSession>,
    headers: HeaderMap,
    Json(req): Json<RedeemRequest>,
) -> Result<Response> {
    if session.role != Role::Student {
        return Err(AppError::Unauthorized);
    }

    let meta = ClientMeta {
        ip: addr.ip().to_string(),
        device: headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string(),
    };

    let verdict =
        attendance_service::redeem(&state, session.user_id, &req.qr_data, &meta).await;

    let (status, body) = match verdict {
        Verdict::Accepted => (
            StatusCode::OK,
            sonic_rs::to_string(&sonic_rs::json!({
                "success": true,
                "message": "Attendance recorded successfully"
            }))
            .unwrap(),
        ),
        Verdict::Rejected(RejectReason::StoreUnavailable) => (
            StatusCode::SERVICE_UNAVAILABLE,
            sonic_rs::to_string(&sonic_rs::json!({
                "success": false,
                "error": RejectReason::StoreUnavailable.message()
            }))
            .unwrap(),
        ),
        Verdict::Rejected(reason) => (
            StatusCode::OK,
            sonic_rs::to_string(&sonic_rs::json!({
                "success": false,
                "error": reason.message()
            }))
            .unwrap(),
        ),
    };

    Ok((status, body).into_response())
}

/// Lists the caller's own attendance history, newest first.
#[axum::debug_handler]
pub async fn my_history(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<Response> {
    let rows = attendance_service::student_history(&state, session.user_id).await?;

    let records_json: Vec<_> = rows
        .into_iter()
        .map(|r| {
            sonic_rs::json!({
                "record_id": r.record_id,
                "class_id": r.class_id,
                "class_name": r.class_name,
                "session_date": r.session_date.to_string(),
                "recorded_at": r.recorded_at.to_rfc3339()
            })
        })
        .collect();

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "records": records_json
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}
