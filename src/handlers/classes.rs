use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::Result,
    models::session::AuthSession,
    services::attendance as attendance_service,
    services::classes as class_service,
    state::AppState,
    validation::classes::{validate_class_code, validate_class_name},
};

/// The request payload for creating a class.
#[derive(Deserialize)]
pub struct CreateClassRequest {
    pub name: String,
    pub code: String,
    pub schedule: Option<String>,
}

/// Creates a new class owned by the requesting instructor.
#[axum::debug_handler]
pub async fn create_class(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<CreateClassRequest>,
) -> Result<Response> {
    validate_class_name(&req.name)?;
    validate_class_code(&req.code)?;

    let class = class_service::create_class(
        &state,
        session.user_id,
        &req.name,
        &req.code,
        req.schedule.as_deref(),
    )
    .await?;

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "id": class.id,
        "name": class.name,
        "code": class.code,
        "schedule": class.schedule,
        "created_at": class.created_at.to_rfc3339(),
        "message": "Class created successfully"
    }))
    .unwrap();

    Ok((StatusCode::CREATED, response).into_response())
}

/// Lists the classes visible to the caller.
#[axum::debug_handler]
pub async fn list_classes(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<Response> {
    let classes = class_service::list_classes(&state, session.user_id, session.role).await?;

    let classes_json: Vec<_> = classes
        .into_iter()
        .map(|c| {
            sonic_rs::json!({
                "id": c.id,
                "name": c.name,
                "code": c.code,
                "schedule": c.schedule,
                "created_at": c.created_at.to_rfc3339()
            })
        })
        .collect();

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "classes": classes_json
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}

/// Opens an attendance session for a class and returns its QR payload.
#[axum::debug_handler]
pub async fn open_qr_session(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(class_id): Path<i64>,
) -> Result<Response> {
    let opened =
        attendance_service::open_session(&state, session.user_id, class_id).await?;

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "session_id": opened.session.id,
        "class_id": opened.redemption.class_id,
        "qr_data": opened.qr_data,
        "created_at": opened.redemption.created_at,
        "expires_at": opened.redemption.expires_at,
        "session_date": opened.session.session_date.to_string()
    }))
    .unwrap();

    Ok((StatusCode::CREATED, response).into_response())
}

/// Closes an attendance session, killing its outstanding QR code.
#[axum::debug_handler]
pub async fn close_session(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path((class_id, session_id)): Path<(i64, i64)>,
) -> Result<Response> {
    attendance_service::close_session(&state, session.user_id, class_id, session_id).await?;

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "success": true,
        "message": "Session closed"
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}

/// Builds the per-student attendance report for a class.
#[axum::debug_handler]
pub async fn class_report(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(class_id): Path<i64>,
) -> Result<Response> {
    let rows = attendance_service::class_report(&state, session.user_id, class_id).await?;

    let students_json: Vec<_> = rows
        .into_iter()
        .map(|r| {
            sonic_rs::json!({
                "username": r.username,
                "full_name": r.full_name,
                "sessions_attended": r.sessions_attended,
                "total_sessions": r.total_sessions,
                "attendance_rate": r.attendance_rate
            })
        })
        .collect();

    let response = sonic_rs::to_string(&sonic_rs::json!({
        "class_id": class_id,
        "students": students_json
    }))
    .unwrap();

    Ok((StatusCode::OK, response).into_response())
}
