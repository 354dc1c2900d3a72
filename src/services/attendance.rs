use chrono::Utc;

use crate::{
    error::{AppError, Result},
    models::attendance::{AttendanceHistoryRow, AttendanceSession, ClassReportRow},
    models::class::Class,
    repositories::attendance as attendance_repo,
    repositories::class as class_repo,
    security::codec,
    security::engine::Verdict,
    security::registry::RedemptionSession,
    security::store::{AttendanceStore, ClientMeta},
    state::AppState,
};

/// Everything produced by opening an attendance session: the durable row,
/// the in-memory redemption session and the rendered QR payload.
pub struct OpenedSession {
    pub session: AttendanceSession,
    pub redemption: RedemptionSession,
    pub qr_data: String,
}

/// Opens an attendance session for a class and issues its QR payload.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `instructor_id` - The instructor making the request; must own the class.
/// * `class_id` - The class to open a session for.
///
/// # Returns
///
/// A `Result` containing the [`OpenedSession`].
pub async fn open_session(
    state: &AppState,
    instructor_id: i64,
    class_id: i64,
) -> Result<OpenedSession> {
    let class = owned_class(state, instructor_id, class_id).await?;

    let session = attendance_repo::create_session(&state.db, class.id).await?;
    let redemption = state.registry.create(class.id, session.id);
    let qr_data = codec::encode(class.id, &redemption.token, redemption.created_at);

    tracing::info!(
        "📋 Attendance session opened: class={} session={} window={}s",
        class.id,
        session.id,
        state.registry.validity_window_secs()
    );

    Ok(OpenedSession {
        session,
        redemption,
        qr_data,
    })
}

/// Closes an attendance session and drops its redemption session, so any
/// outstanding QR code for it dies immediately.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `instructor_id` - The instructor making the request; must own the class.
/// * `class_id` - The class the session belongs to.
/// * `session_id` - The session to close.
pub async fn close_session(
    state: &AppState,
    instructor_id: i64,
    class_id: i64,
    session_id: i64,
) -> Result<()> {
    owned_class(state, instructor_id, class_id).await?;

    let session = state
        .store
        .get_active_session(session_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if session.class_id != class_id {
        return Err(AppError::NotFound);
    }

    attendance_repo::close_session(&state.db, session_id).await?;
    state.registry.invalidate_session(session_id);

    tracing::info!("🔒 Attendance session closed: class={} session={}", class_id, session_id);
    Ok(())
}

/// Validates one scanned QR payload for one student.
///
/// Rejections come back as verdicts, not errors; the handler decides what
/// status each one maps to.
pub async fn redeem(
    state: &AppState,
    student_id: i64,
    qr_data: &str,
    meta: &ClientMeta,
) -> Verdict {
    state
        .engine
        .validate(qr_data, student_id, meta, Utc::now().timestamp())
        .await
}

/// Builds the per-student attendance report for a class the instructor owns.
pub async fn class_report(
    state: &AppState,
    instructor_id: i64,
    class_id: i64,
) -> Result<Vec<ClassReportRow>> {
    owned_class(state, instructor_id, class_id).await?;
    attendance_repo::class_report(&state.db, class_id).await
}

/// Lists the requesting student's own attendance history.
pub async fn student_history(
    state: &AppState,
    student_id: i64,
) -> Result<Vec<AttendanceHistoryRow>> {
    attendance_repo::student_history(&state.db, student_id).await
}

/// Fetches a class and checks the requester owns it.
async fn owned_class(state: &AppState, instructor_id: i64, class_id: i64) -> Result<Class> {
    let class = class_repo::find_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if class.instructor_id != instructor_id {
        return Err(AppError::Unauthorized);
    }
    Ok(class)
}
