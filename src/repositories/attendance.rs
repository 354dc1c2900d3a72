use deadpool_postgres::Pool;

use crate::{
    error::Result,
    models::attendance::{AttendanceHistoryRow, AttendanceSession, ClassReportRow},
    security::store::{AttendanceStore, ClientMeta, InsertOutcome},
};

/// Opens a new attendance session row for a class.
pub async fn create_session(pool: &Pool, class_id: i64) -> Result<AttendanceSession> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO attendance_sessions (class_id)
            VALUES ($1)
            RETURNING *
            "#,
            &[&class_id],
        )
        .await?;
    Ok(AttendanceSession::from(&row))
}

/// Closes an attendance session.
///
/// # Returns
///
/// `true` if the session existed and was still open.
pub async fn close_session(pool: &Pool, session_id: i64) -> Result<bool> {
    let client = pool.get().await?;
    let updated = client
        .execute(
            r#"
            UPDATE attendance_sessions
            SET is_active = false, ended_at = NOW()
            WHERE id = $1 AND is_active = true
            "#,
            &[&session_id],
        )
        .await?;
    Ok(updated == 1)
}

/// Lists one student's attendance history, newest first.
pub async fn student_history(pool: &Pool, student_id: i64) -> Result<Vec<AttendanceHistoryRow>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT
                ar.id AS record_id,
                c.id AS class_id,
                c.name AS class_name,
                s.session_date,
                ar.recorded_at
            FROM attendance_records ar
            JOIN attendance_sessions s ON s.id = ar.session_id
            JOIN classes c ON c.id = s.class_id
            WHERE ar.student_id = $1
            ORDER BY ar.recorded_at DESC
            "#,
            &[&student_id],
        )
        .await?;
    Ok(rows.iter().map(AttendanceHistoryRow::from).collect())
}

/// Builds the per-student attendance aggregate for one class.
///
/// Every student is paired with every session the class has held, so the
/// rate is over sessions held, not sessions attended. A class that has held
/// no sessions yields no rows.
pub async fn class_report(pool: &Pool, class_id: i64) -> Result<Vec<ClassReportRow>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT
                u.username,
                u.full_name,
                COUNT(DISTINCT ar.session_id) AS sessions_attended,
                COUNT(DISTINCT s.id) AS total_sessions,
                (COUNT(DISTINCT ar.session_id) * 100.0
                    / COUNT(DISTINCT s.id))::double precision AS attendance_rate
            FROM users u
            CROSS JOIN attendance_sessions s
            LEFT JOIN attendance_records ar
                ON ar.session_id = s.id AND ar.student_id = u.id
            WHERE u.role = 'student' AND s.class_id = $1
            GROUP BY u.id, u.username, u.full_name
            ORDER BY u.username
            "#,
            &[&class_id],
        )
        .await?;
    Ok(rows.iter().map(ClassReportRow::from).collect())
}

/// [`AttendanceStore`] backed by Postgres. The unique constraint on
/// `(session_id, student_id)` is what makes the insert exactly-once under
/// racing requests.
#[derive(Clone)]
pub struct PgAttendanceStore {
    pool: Pool,
}

impl PgAttendanceStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl AttendanceStore for PgAttendanceStore {
    async fn insert_attendance_if_absent(
        &self,
        session_id: i64,
        student_id: i64,
        meta: &ClientMeta,
    ) -> Result<InsertOutcome> {
        let client = self.pool.get().await?;
        let inserted = client
            .execute(
                r#"
                INSERT INTO attendance_records (session_id, student_id, ip_address, device_info)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (session_id, student_id) DO NOTHING
                "#,
                &[&session_id, &student_id, &meta.ip, &meta.device],
            )
            .await?;
        if inserted == 1 {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::Conflict)
        }
    }

    async fn get_active_session(&self, session_id: i64) -> Result<Option<AttendanceSession>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM attendance_sessions
                WHERE id = $1 AND is_active = true
                "#,
                &[&session_id],
            )
            .await?;
        Ok(row.map(|r| AttendanceSession::from(&r)))
    }
}
