use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rollcall::error::Result;
use rollcall::models::attendance::AttendanceSession;
use rollcall::security::codec;
use rollcall::security::engine::{RedemptionEngine, RejectReason, Verdict};
use rollcall::security::ledger::{SecurityEventKind, SecurityLedger};
use rollcall::security::registry::SessionRegistry;
use rollcall::security::store::{AttendanceStore, ClientMeta, InsertOutcome};

/// Durable store stand-in backed by the same uniqueness rule as the real
/// table: one row per (session, student).
#[derive(Clone, Default)]
struct MemoryStore {
    rows: Arc<Mutex<HashSet<(i64, i64)>>>,
}

impl MemoryStore {
    fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl AttendanceStore for MemoryStore {
    async fn insert_attendance_if_absent(
        &self,
        session_id: i64,
        student_id: i64,
        _meta: &ClientMeta,
    ) -> Result<InsertOutcome> {
        let mut rows = self.rows.lock().unwrap();
        if rows.insert((session_id, student_id)) {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::Conflict)
        }
    }

    async fn get_active_session(&self, _session_id: i64) -> Result<Option<AttendanceSession>> {
        Ok(None)
    }
}

struct TestContext {
    engine: RedemptionEngine<MemoryStore>,
    registry: SessionRegistry,
    ledger: SecurityLedger,
    store: MemoryStore,
}

impl TestContext {
    fn new() -> Self {
        Self::with_ledger_capacity(100)
    }

    fn with_ledger_capacity(max_events: usize) -> Self {
        let registry = SessionRegistry::new(300, 16);
        let ledger = SecurityLedger::new(max_events);
        let store = MemoryStore::default();
        let engine = RedemptionEngine::new(registry.clone(), ledger.clone(), store.clone());
        Self {
            engine,
            registry,
            ledger,
            store,
        }
    }

    fn meta() -> ClientMeta {
        ClientMeta {
            ip: "203.0.113.9".to_string(),
            device: "Mozilla/5.0 (test)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classroom_lifecycle_records_each_student_once() {
        let ctx = TestContext::new();

        // Instructor projects one QR code for the whole lecture.
        let session = ctx.registry.create_at(1, 10, 1000);
        let raw = codec::encode(1, &session.token, session.created_at);

        // Students trickle in across the window, one right on the boundary.
        for (student, at) in [(1, 1005), (2, 1150), (3, 1300)] {
            assert_eq!(
                ctx.engine.validate(&raw, student, &TestContext::meta(), at).await,
                Verdict::Accepted,
                "student {student} at t={at}"
            );
        }

        // A nervous double-scan changes nothing.
        assert_eq!(
            ctx.engine.validate(&raw, 2, &TestContext::meta(), 1200).await,
            Verdict::Rejected(RejectReason::DuplicateRedemption)
        );

        // The latecomer is turned away quietly once the window closes.
        assert_eq!(
            ctx.engine.validate(&raw, 4, &TestContext::meta(), 1301).await,
            Verdict::Rejected(RejectReason::ExpiredSession)
        );

        assert_eq!(ctx.store.row_count(), 3);
        // An ordinary lecture leaves no trace in the anomaly ledger.
        assert!(ctx.ledger.is_empty());
    }

    #[tokio::test]
    async fn closing_a_session_revokes_its_token_mid_window() {
        let ctx = TestContext::new();
        let session = ctx.registry.create_at(1, 10, 1000);
        let raw = codec::encode(1, &session.token, session.created_at);

        assert_eq!(
            ctx.engine.validate(&raw, 1, &TestContext::meta(), 1050).await,
            Verdict::Accepted
        );

        // Instructor ends the lecture early.
        assert!(ctx.registry.invalidate_session(10));
        assert_eq!(ctx.registry.active_count_at(1100), 0);

        // The projected code still looks fresh, so the attempt is suspicious.
        let verdict = ctx.engine.validate(&raw, 2, &TestContext::meta(), 1120).await;
        assert_eq!(verdict, Verdict::Rejected(RejectReason::UnknownSession));
        assert_eq!(
            ctx.ledger.recent_events(1)[0].kind,
            SecurityEventKind::UnknownSession
        );
        assert_eq!(ctx.store.row_count(), 1);
    }

    #[tokio::test]
    async fn reopening_a_class_issues_a_fresh_token() {
        let ctx = TestContext::new();

        let first = ctx.registry.create_at(1, 10, 1000);
        let first_raw = codec::encode(1, &first.token, first.created_at);
        ctx.registry.invalidate_session(10);

        let second = ctx.registry.create_at(1, 11, 1010);
        let second_raw = codec::encode(1, &second.token, second.created_at);
        assert_ne!(first.token, second.token);

        // The stale projection no longer redeems; the new one does.
        assert_eq!(
            ctx.engine.validate(&first_raw, 1, &TestContext::meta(), 1050).await,
            Verdict::Rejected(RejectReason::UnknownSession)
        );
        assert_eq!(
            ctx.engine.validate(&second_raw, 1, &TestContext::meta(), 1050).await,
            Verdict::Accepted
        );

        // Attendance landed on the reopened session, not the closed one.
        assert!(ctx.store.rows.lock().unwrap().contains(&(11, 1)));
        assert!(!ctx.store.rows.lock().unwrap().contains(&(10, 1)));
    }

    #[tokio::test]
    async fn anomalies_carry_client_context_into_the_ledger() {
        let ctx = TestContext::new();
        let session = ctx.registry.create_at(1, 10, 1000);

        // Stamp rewound well past the drift allowance on a live session.
        let tampered = codec::encode(1, &session.token, 900);
        assert_eq!(
            ctx.engine.validate(&tampered, 1, &TestContext::meta(), 1100).await,
            Verdict::Rejected(RejectReason::TimestampSkew)
        );

        assert_eq!(
            ctx.engine
                .validate("ATTEND:not-a-class:oops", 1, &TestContext::meta(), 1100)
                .await,
            Verdict::Rejected(RejectReason::MalformedPayload)
        );

        let events = ctx.ledger.recent_events(10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, SecurityEventKind::TimestampSkew);
        assert_eq!(events[1].kind, SecurityEventKind::MalformedPayload);
        for event in &events {
            assert!(
                event.detail.contains("ip=203.0.113.9"),
                "detail missing client context: {}",
                event.detail
            );
        }
    }

    #[tokio::test]
    async fn summary_combines_live_sessions_with_the_bounded_ring() {
        let ctx = TestContext::with_ledger_capacity(2);

        ctx.registry.create_at(1, 10, 1000);
        ctx.registry.create_at(2, 20, 1000);

        for n in 0..3 {
            let unknown = codec::encode(9, &format!("UNKNOWNTOKEN{n:04}"), 1000);
            ctx.engine.validate(&unknown, 1, &TestContext::meta(), 1005).await;
        }

        let summary = ctx.ledger.summary(ctx.registry.active_count_at(1010));
        // The ring kept only the newest two, but the total remembers all three.
        assert_eq!(summary.total_recorded, 3);
        assert_eq!(summary.recent.len(), 2);
        assert_eq!(summary.active_sessions, 2);
        assert!(summary.recent[0].detail.contains("UNKNOWNTOKEN0001"));
        assert!(summary.recent[1].detail.contains("UNKNOWNTOKEN0002"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_scans_across_classes_record_each_pair_once() {
        let ctx = TestContext::new();

        let lecture_a = ctx.registry.create_at(1, 10, 1000);
        let lecture_b = ctx.registry.create_at(2, 20, 1000);
        let raw_a = codec::encode(1, &lecture_a.token, lecture_a.created_at);
        let raw_b = codec::encode(2, &lecture_b.token, lecture_b.created_at);

        // Four students per lecture, each scanning twice in parallel.
        let mut handles = Vec::new();
        for raw in [raw_a, raw_b] {
            for student in 1..=4 {
                for _ in 0..2 {
                    let engine = ctx.engine.clone();
                    let raw = raw.clone();
                    handles.push(tokio::spawn(async move {
                        engine.validate(&raw, student, &TestContext::meta(), 1100).await
                    }));
                }
            }
        }

        let mut accepted = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Verdict::Accepted => accepted += 1,
                Verdict::Rejected(RejectReason::DuplicateRedemption) => duplicates += 1,
                other => panic!("unexpected verdict {other:?}"),
            }
        }

        assert_eq!(accepted, 8);
        assert_eq!(duplicates, 8);
        assert_eq!(ctx.store.row_count(), 8);
    }
}
