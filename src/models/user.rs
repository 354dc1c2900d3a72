use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// What a logged-in account is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "user_role")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Opens classes and sessions, reads reports.
    #[postgres(name = "instructor")]
    Instructor,
    /// Redeems QR codes, reads their own attendance.
    #[postgres(name = "student")]
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instructor => "instructor",
            Self::Student => "student",
        }
    }
}

/// A user account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// The unique identifier for the user.
    pub id: i64,
    /// The login name, unique across the system.
    pub username: String,
    /// The Argon2id hash of the user's password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// What the account may do.
    pub role: Role,
    /// Display name shown in reports.
    pub full_name: Option<String>,
    /// Contact address, if provided.
    pub email: Option<String>,
    /// The timestamp when the account was created.
    pub created_at: DateTime<Utc>,
    /// Whether the account may log in.
    pub is_active: bool,
}

impl From<&Row> for User {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            role: row.get("role"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            created_at: row.get("created_at"),
            is_active: row.get("is_active"),
        }
    }
}
