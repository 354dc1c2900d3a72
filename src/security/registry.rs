use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::security::token;

/// One live QR redemption session.
///
/// Lives only in process memory. A crash or restart drops all entries, which
/// simply forces instructors to reissue codes; no durable attendance data is
/// lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionSession {
    /// Durable attendance session row this entry maps to, 1:1.
    pub attendance_session_id: i64,
    /// The class the session was opened for.
    pub class_id: i64,
    /// Random alphanumeric token printed into the QR code.
    pub token: String,
    /// Unix timestamp (seconds) the session was opened.
    pub created_at: i64,
    /// Unix timestamp (seconds) after which the session is no longer redeemable.
    pub expires_at: i64,
}

/// Outcome of a registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The session exists and is still redeemable.
    Active(RedemptionSession),
    /// The session existed but its window has passed. The stale entry is
    /// returned so callers can compare its timestamps against a payload's
    /// claim; it has already been evicted from the map.
    Expired(RedemptionSession),
    /// No session under that (class, token) pair.
    Missing,
}

/// In-memory registry of active redemption sessions, keyed by
/// `(class_id, token)`.
///
/// All operations take a single coarse lock; sessions number in the dozens,
/// not the millions, so contention is a non-issue. Expiry is enforced lazily:
/// expired entries are dropped on the lookup that finds them and swept
/// whenever a new session is created. There is no background timer.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<(i64, String), RedemptionSession>>>,
    validity_window_secs: i64,
    token_length: usize,
}

impl SessionRegistry {
    /// Creates an empty registry.
    ///
    /// # Arguments
    ///
    /// * `validity_window_secs` - How long a session stays redeemable.
    /// * `token_length` - Length of generated tokens, in characters.
    pub fn new(validity_window_secs: i64, token_length: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            validity_window_secs,
            token_length,
        }
    }

    /// The configured validity window, in seconds.
    pub fn validity_window_secs(&self) -> i64 {
        self.validity_window_secs
    }

    /// Opens a new redemption session for a class.
    ///
    /// Generates the token internally, stamps the validity window and inserts
    /// the entry. Expired entries are swept first so the map never grows past
    /// the set of sessions that were recently live.
    pub fn create(&self, class_id: i64, attendance_session_id: i64) -> RedemptionSession {
        self.create_at(class_id, attendance_session_id, Utc::now().timestamp())
    }

    /// Like [`SessionRegistry::create`], with an explicit clock.
    pub fn create_at(
        &self,
        class_id: i64,
        attendance_session_id: i64,
        now: i64,
    ) -> RedemptionSession {
        let mut sessions = self.lock();
        sweep(&mut sessions, now);

        let mut token = token::generate(self.token_length);
        while sessions.contains_key(&(class_id, token.clone())) {
            token = token::generate(self.token_length);
        }

        let session = RedemptionSession {
            attendance_session_id,
            class_id,
            token: token.clone(),
            created_at: now,
            expires_at: now + self.validity_window_secs,
        };
        sessions.insert((class_id, token), session.clone());

        tracing::debug!(
            "🔑 Redemption session opened: class={} session={} expires_at={}",
            class_id,
            attendance_session_id,
            session.expires_at
        );
        session
    }

    /// Looks up a session by `(class_id, token)`.
    pub fn lookup(&self, class_id: i64, token: &str) -> Lookup {
        self.lookup_at(class_id, token, Utc::now().timestamp())
    }

    /// Like [`SessionRegistry::lookup`], with an explicit clock.
    ///
    /// A session is redeemable while `now <= expires_at`. An entry found past
    /// its window is evicted on the spot and reported as [`Lookup::Expired`].
    pub fn lookup_at(&self, class_id: i64, token: &str, now: i64) -> Lookup {
        let mut sessions = self.lock();
        let key = (class_id, token.to_string());
        let Some(session) = sessions.get(&key).cloned() else {
            return Lookup::Missing;
        };
        if now <= session.expires_at {
            return Lookup::Active(session);
        }
        sessions.remove(&key);
        Lookup::Expired(session)
    }

    /// Removes a session by `(class_id, token)`.
    ///
    /// # Returns
    ///
    /// `true` if an entry was removed.
    pub fn invalidate(&self, class_id: i64, token: &str) -> bool {
        let removed = self.lock().remove(&(class_id, token.to_string())).is_some();
        if removed {
            tracing::debug!("Redemption session invalidated: class={}", class_id);
        }
        removed
    }

    /// Removes the session bound to a durable attendance session row, if any.
    ///
    /// Used when an instructor closes a session by id and the token is not at
    /// hand. Linear scan; the map stays small.
    pub fn invalidate_session(&self, attendance_session_id: i64) -> bool {
        let mut sessions = self.lock();
        let key = sessions
            .iter()
            .find(|(_, s)| s.attendance_session_id == attendance_session_id)
            .map(|(k, _)| k.clone());
        match key {
            Some(key) => {
                sessions.remove(&key);
                tracing::debug!(
                    "Redemption session invalidated: session={}",
                    attendance_session_id
                );
                true
            }
            None => false,
        }
    }

    /// Number of sessions still inside their validity window.
    pub fn active_count(&self) -> usize {
        self.active_count_at(Utc::now().timestamp())
    }

    /// Like [`SessionRegistry::active_count`], with an explicit clock.
    pub fn active_count_at(&self, now: i64) -> usize {
        let mut sessions = self.lock();
        sweep(&mut sessions, now);
        sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(i64, String), RedemptionSession>> {
        // The map stays structurally valid across a panic in another holder;
        // every mutation is a single insert or remove.
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn sweep(sessions: &mut HashMap<(i64, String), RedemptionSession>, now: i64) {
    sessions.retain(|_, session| now <= session.expires_at);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(300, 16)
    }

    #[test]
    fn create_stamps_window_and_token() {
        let registry = registry();
        let session = registry.create_at(1, 10, 1000);
        assert_eq!(session.class_id, 1);
        assert_eq!(session.attendance_session_id, 10);
        assert_eq!(session.created_at, 1000);
        assert_eq!(session.expires_at, 1300);
        assert_eq!(session.token.len(), 16);
    }

    #[test]
    fn lookup_is_active_through_the_window_boundary() {
        let registry = registry();
        let session = registry.create_at(1, 10, 1000);
        assert!(matches!(
            registry.lookup_at(1, &session.token, 1000),
            Lookup::Active(_)
        ));
        // Inclusive boundary: still redeemable at exactly expires_at.
        assert!(matches!(
            registry.lookup_at(1, &session.token, 1300),
            Lookup::Active(_)
        ));
    }

    #[test]
    fn lookup_past_window_reports_expired_then_missing() {
        let registry = registry();
        let session = registry.create_at(1, 10, 1000);
        match registry.lookup_at(1, &session.token, 1301) {
            Lookup::Expired(stale) => assert_eq!(stale.created_at, 1000),
            other => panic!("expected Expired, got {other:?}"),
        }
        // The stale entry was evicted by the first lookup.
        assert_eq!(registry.lookup_at(1, &session.token, 1301), Lookup::Missing);
    }

    #[test]
    fn lookup_unknown_token_is_missing() {
        let registry = registry();
        registry.create_at(1, 10, 1000);
        assert_eq!(registry.lookup_at(1, "nope", 1000), Lookup::Missing);
    }

    #[test]
    fn token_is_scoped_to_its_class() {
        let registry = registry();
        let session = registry.create_at(1, 10, 1000);
        assert_eq!(registry.lookup_at(2, &session.token, 1000), Lookup::Missing);
    }

    #[test]
    fn invalidate_removes_by_key() {
        let registry = registry();
        let session = registry.create_at(1, 10, 1000);
        assert!(registry.invalidate(1, &session.token));
        assert!(!registry.invalidate(1, &session.token));
        assert_eq!(registry.lookup_at(1, &session.token, 1000), Lookup::Missing);
    }

    #[test]
    fn invalidate_session_removes_by_row_id() {
        let registry = registry();
        let session = registry.create_at(1, 10, 1000);
        assert!(registry.invalidate_session(10));
        assert!(!registry.invalidate_session(10));
        assert_eq!(registry.lookup_at(1, &session.token, 1000), Lookup::Missing);
    }

    #[test]
    fn create_sweeps_expired_entries() {
        let registry = registry();
        registry.create_at(1, 10, 1000);
        registry.create_at(2, 11, 1000);
        assert_eq!(registry.active_count_at(1000), 2);

        // Both windows have passed by 1400; opening a new session sweeps them.
        registry.create_at(3, 12, 1400);
        assert_eq!(registry.active_count_at(1400), 1);
    }

    #[test]
    fn active_count_ignores_expired_entries() {
        let registry = registry();
        registry.create_at(1, 10, 1000);
        assert_eq!(registry.active_count_at(1000), 1);
        assert_eq!(registry.active_count_at(1301), 0);
    }

    #[test]
    fn same_class_can_hold_multiple_sessions() {
        let registry = registry();
        let a = registry.create_at(1, 10, 1000);
        let b = registry.create_at(1, 11, 1050);
        assert_ne!(a.token, b.token);
        assert!(matches!(registry.lookup_at(1, &a.token, 1100), Lookup::Active(_)));
        assert!(matches!(registry.lookup_at(1, &b.token, 1100), Lookup::Active(_)));
    }
}
