use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many events a report summary includes.
const SUMMARY_RECENT_EVENTS: usize = 10;

/// Category of a recorded security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityEventKind {
    /// Payload failed to decode.
    MalformedPayload,
    /// Well-formed payload for a session this process never opened.
    UnknownSession,
    /// Stale token presented with a timestamp that still claimed freshness.
    ExpiredSession,
    /// Embedded timestamp drifted from the session's stored timestamps.
    TimestampSkew,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedPayload => "malformed-payload",
            Self::UnknownSession => "unknown-session",
            Self::ExpiredSession => "expired-session",
            Self::TimestampSkew => "timestamp-skew",
        }
    }
}

/// One suspicious redemption attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// What category of anomaly this was.
    pub kind: SecurityEventKind,
    /// Free-form context: offending values, client metadata.
    pub detail: String,
}

/// Aggregate view served by the security report endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SecuritySummary {
    /// Events recorded since process start, including evicted ones.
    pub total_recorded: u64,
    /// Redemption sessions currently inside their validity window.
    pub active_sessions: usize,
    /// The newest events, oldest first.
    pub recent: Vec<SecurityEvent>,
}

struct LedgerInner {
    events: VecDeque<SecurityEvent>,
    total_recorded: u64,
}

/// Bounded in-memory ledger of suspicious redemption attempts.
///
/// Holds at most `max_events` entries; recording one more evicts the oldest.
/// `total_recorded` keeps counting monotonically regardless of eviction, so
/// the report can distinguish "quiet day" from "ring rolled over". Contents
/// are process-local and vanish on restart.
#[derive(Clone)]
pub struct SecurityLedger {
    inner: Arc<Mutex<LedgerInner>>,
    max_events: usize,
}

impl SecurityLedger {
    /// Creates an empty ledger retaining at most `max_events` entries.
    pub fn new(max_events: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerInner {
                events: VecDeque::with_capacity(max_events.min(1024)),
                total_recorded: 0,
            })),
            max_events,
        }
    }

    /// Records one event, evicting the oldest entry when the ring is full.
    pub fn record(&self, kind: SecurityEventKind, detail: String) {
        tracing::warn!("🚨 Suspicious activity [{}]: {}", kind.as_str(), detail);

        let mut inner = self.lock();
        inner.events.push_back(SecurityEvent {
            timestamp: Utc::now(),
            kind,
            detail,
        });
        if inner.events.len() > self.max_events {
            inner.events.pop_front();
        }
        inner.total_recorded += 1;
    }

    /// The newest `n` events, oldest first.
    pub fn recent_events(&self, n: usize) -> Vec<SecurityEvent> {
        let inner = self.lock();
        let skip = inner.events.len().saturating_sub(n);
        inner.events.iter().skip(skip).cloned().collect()
    }

    /// Events recorded since process start, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.lock().total_recorded
    }

    /// Events currently retained in the ring.
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the aggregate view for the security report endpoint.
    ///
    /// # Arguments
    ///
    /// * `active_sessions` - Current registry count, supplied by the caller.
    pub fn summary(&self, active_sessions: usize) -> SecuritySummary {
        SecuritySummary {
            total_recorded: self.total_recorded(),
            active_sessions,
            recent: self.recent_events(SUMMARY_RECENT_EVENTS),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_counts() {
        let ledger = SecurityLedger::new(100);
        assert!(ledger.is_empty());

        ledger.record(SecurityEventKind::MalformedPayload, "bad prefix".to_string());
        ledger.record(SecurityEventKind::UnknownSession, "class 9".to_string());

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.total_recorded(), 2);
        let events = ledger.recent_events(10);
        assert_eq!(events[0].kind, SecurityEventKind::MalformedPayload);
        assert_eq!(events[1].kind, SecurityEventKind::UnknownSession);
    }

    #[test]
    fn ring_evicts_oldest_but_total_keeps_counting() {
        let ledger = SecurityLedger::new(3);
        for i in 0..5 {
            ledger.record(SecurityEventKind::TimestampSkew, format!("event {i}"));
        }

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.total_recorded(), 5);

        let events = ledger.recent_events(10);
        assert_eq!(events[0].detail, "event 2");
        assert_eq!(events[2].detail, "event 4");
    }

    #[test]
    fn zero_capacity_ring_retains_nothing_but_still_counts() {
        let ledger = SecurityLedger::new(0);
        for i in 0..3 {
            ledger.record(SecurityEventKind::ExpiredSession, format!("event {i}"));
        }

        assert!(ledger.is_empty());
        assert!(ledger.recent_events(10).is_empty());
        assert_eq!(ledger.total_recorded(), 3);
    }

    #[test]
    fn recent_events_returns_newest_oldest_first() {
        let ledger = SecurityLedger::new(100);
        for i in 0..4 {
            ledger.record(SecurityEventKind::MalformedPayload, format!("event {i}"));
        }

        let last_two = ledger.recent_events(2);
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].detail, "event 2");
        assert_eq!(last_two[1].detail, "event 3");
    }

    #[test]
    fn summary_caps_recent_at_ten() {
        let ledger = SecurityLedger::new(100);
        for i in 0..15 {
            ledger.record(SecurityEventKind::UnknownSession, format!("event {i}"));
        }

        let summary = ledger.summary(4);
        assert_eq!(summary.total_recorded, 15);
        assert_eq!(summary.active_sessions, 4);
        assert_eq!(summary.recent.len(), 10);
        assert_eq!(summary.recent[0].detail, "event 5");
        assert_eq!(summary.recent[9].detail, "event 14");
    }

    #[test]
    fn event_kinds_serialize_as_kebab_case() {
        let ledger = SecurityLedger::new(10);
        ledger.record(SecurityEventKind::TimestampSkew, "drift".to_string());
        let json = serde_json::to_string(&ledger.recent_events(1)[0]).unwrap();
        assert!(json.contains("\"timestamp-skew\""));
    }
}
