use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::Role;

/// A logged-in user's session, stored as JSON in Redis under
/// `session:<uuid>` and rehydrated by the auth middleware on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// The ID of the user this session belongs to.
    pub user_id: i64,
    /// Login name, kept here so handlers can log it without a lookup.
    pub username: String,
    /// The role the user held at login time.
    pub role: Role,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}
