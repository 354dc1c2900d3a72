use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio_postgres::Row;

/// A durable attendance session: one sitting of one class for which QR codes
/// were issued. Stays in the database after it closes; the in-memory
/// redemption session that points at it is the part that expires.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSession {
    /// The session's unique identifier.
    pub id: i64,
    /// The class this session belongs to.
    pub class_id: i64,
    /// Calendar day of the sitting.
    pub session_date: NaiveDate,
    /// When the session was opened.
    pub started_at: DateTime<Utc>,
    /// When the session was closed, if it has been.
    pub ended_at: Option<DateTime<Utc>>,
    /// Whether redemptions may still land on this session.
    pub is_active: bool,
}

impl From<&Row> for AttendanceSession {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            class_id: row.get("class_id"),
            session_date: row.get("session_date"),
            started_at: row.get("started_at"),
            ended_at: row.get("ended_at"),
            is_active: row.get("is_active"),
        }
    }
}

/// One student's presence at one session. `(session_id, student_id)` is
/// unique; the insert path relies on that constraint for exactly-once
/// semantics.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecord {
    /// The record's unique identifier.
    pub id: i64,
    /// The session attended.
    pub session_id: i64,
    /// The student who attended.
    pub student_id: i64,
    /// When the redemption landed.
    pub recorded_at: DateTime<Utc>,
    /// Peer IP at redemption time.
    pub ip_address: Option<String>,
    /// User-agent at redemption time.
    pub device_info: Option<String>,
    /// Presence status; currently always "present".
    pub status: String,
}

impl From<&Row> for AttendanceRecord {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            session_id: row.get("session_id"),
            student_id: row.get("student_id"),
            recorded_at: row.get("recorded_at"),
            ip_address: row.get("ip_address"),
            device_info: row.get("device_info"),
            status: row.get("status"),
        }
    }
}

/// One student's attendance entry joined with its session, as returned by
/// the student-facing history endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceHistoryRow {
    /// The record's unique identifier.
    pub record_id: i64,
    /// The class attended.
    pub class_id: i64,
    /// The class's display name.
    pub class_name: String,
    /// Calendar day of the sitting.
    pub session_date: NaiveDate,
    /// When the redemption landed.
    pub recorded_at: DateTime<Utc>,
}

impl From<&Row> for AttendanceHistoryRow {
    fn from(row: &Row) -> Self {
        Self {
            record_id: row.get("record_id"),
            class_id: row.get("class_id"),
            class_name: row.get("class_name"),
            session_date: row.get("session_date"),
            recorded_at: row.get("recorded_at"),
        }
    }
}

/// Per-student aggregate for a class report.
#[derive(Debug, Clone, Serialize)]
pub struct ClassReportRow {
    /// The student's login name.
    pub username: String,
    /// The student's display name.
    pub full_name: Option<String>,
    /// Sessions of this class the student attended.
    pub sessions_attended: i64,
    /// Sessions this class has held.
    pub total_sessions: i64,
    /// Attended sessions as a percentage of held sessions.
    pub attendance_rate: f64,
}

impl From<&Row> for ClassReportRow {
    fn from(row: &Row) -> Self {
        Self {
            username: row.get("username"),
            full_name: row.get("full_name"),
            sessions_attended: row.get("sessions_attended"),
            total_sessions: row.get("total_sessions"),
            attendance_rate: row.get("attendance_rate"),
        }
    }
}
