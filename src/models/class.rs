use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_postgres::Row;

/// A class an instructor teaches and students attend.
#[derive(Debug, Clone, Serialize)]
pub struct Class {
    /// The class's unique identifier.
    pub id: i64,
    /// Human-readable class name.
    pub name: String,
    /// Short enrollment code, unique across classes.
    pub code: String,
    /// The instructor who owns this class.
    pub instructor_id: i64,
    /// Free-form schedule text, e.g. "Mon-Wed-Fri 10:00".
    pub schedule: Option<String>,
    /// The timestamp when the class was created.
    pub created_at: DateTime<Utc>,
}

impl From<&Row> for Class {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            code: row.get("code"),
            instructor_id: row.get("instructor_id"),
            schedule: row.get("schedule"),
            created_at: row.get("created_at"),
        }
    }
}
