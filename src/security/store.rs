use std::fmt;
use std::future::Future;

use crate::error::Result;
use crate::models::attendance::AttendanceSession;

/// Client-side context attached to a redemption attempt. Forwarded into the
/// durable record and into ledger details; never used for decisions.
#[derive(Debug, Clone)]
pub struct ClientMeta {
    /// Peer IP as the server saw it.
    pub ip: String,
    /// User-agent string, possibly empty.
    pub device: String,
}

impl fmt::Display for ClientMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ip={} device={}", self.ip, self.device)
    }
}

/// Outcome of an attendance insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written; this subject had not redeemed this session.
    Inserted,
    /// A row already existed for `(session_id, student_id)`; nothing written.
    Conflict,
}

/// Durable storage consulted by the redemption engine.
///
/// The one hard requirement is that [`AttendanceStore::insert_attendance_if_absent`]
/// is atomic at the storage boundary: two racing calls for the same
/// `(session_id, student_id)` must yield exactly one `Inserted`. The Postgres
/// implementation leans on the table's unique constraint for that; tests use
/// an in-memory map behind a lock.
pub trait AttendanceStore: Send + Sync {
    /// Inserts an attendance record unless one already exists for
    /// `(session_id, student_id)`.
    fn insert_attendance_if_absent(
        &self,
        session_id: i64,
        student_id: i64,
        meta: &ClientMeta,
    ) -> impl Future<Output = Result<InsertOutcome>> + Send;

    /// Fetches the attendance session row if it exists and is still open.
    fn get_active_session(
        &self,
        session_id: i64,
    ) -> impl Future<Output = Result<Option<AttendanceSession>>> + Send;
}
