use crate::security::codec;
use crate::security::ledger::{SecurityEventKind, SecurityLedger};
use crate::security::registry::{Lookup, SessionRegistry};
use crate::security::store::{AttendanceStore, ClientMeta, InsertOutcome};

/// Allowed drift between a payload's embedded timestamp and the registry's
/// stored creation time. Covers second-boundary rounding between generation
/// and encoding; anything larger means the payload was edited.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 2;

/// How much of a rejected payload is quoted into ledger details.
const DETAIL_SNIPPET_LEN: usize = 48;

/// Outcome of one redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Attendance was durably recorded for this subject.
    Accepted,
    /// Nothing was recorded; the reason carries the client-facing message.
    Rejected(RejectReason),
}

/// Why a redemption attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Payload failed to decode.
    MalformedPayload,
    /// No registry entry for the (class, token) pair.
    UnknownSession,
    /// The session's validity window has passed.
    ExpiredSession,
    /// Embedded timestamp disagrees with the session or the attempt time.
    TimestampSkew,
    /// This subject already redeemed this session.
    DuplicateRedemption,
    /// The durable store failed; the attempt can be retried.
    StoreUnavailable,
}

impl RejectReason {
    /// The message shown to the scanning client.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MalformedPayload => "Invalid QR format",
            Self::UnknownSession | Self::ExpiredSession => "Invalid or expired QR session",
            Self::TimestampSkew => "Invalid timestamp",
            Self::DuplicateRedemption => "Already attended this session",
            Self::StoreUnavailable => "Database error",
        }
    }
}

/// Validates scanned QR payloads and records attendance exactly once.
///
/// The engine owns no state of its own; it composes the registry (liveness),
/// the ledger (anomaly trail) and the store (durable exactly-once insert).
/// All collaborators are injected, so the whole pipeline runs in tests
/// without a database.
#[derive(Clone)]
pub struct RedemptionEngine<S> {
    registry: SessionRegistry,
    ledger: SecurityLedger,
    store: S,
    validity_window_secs: i64,
}

impl<S: AttendanceStore> RedemptionEngine<S> {
    pub fn new(registry: SessionRegistry, ledger: SecurityLedger, store: S) -> Self {
        let validity_window_secs = registry.validity_window_secs();
        Self {
            registry,
            ledger,
            store,
            validity_window_secs,
        }
    }

    /// Validates one scanned payload for one subject and, if everything
    /// checks out, records attendance durably.
    ///
    /// # Arguments
    ///
    /// * `raw` - The exact string scanned from the QR code.
    /// * `student_id` - Authenticated subject attempting to redeem.
    /// * `meta` - Client context, forwarded into records and ledger details.
    /// * `now` - Attempt time as a Unix timestamp in seconds.
    ///
    /// # Returns
    ///
    /// A [`Verdict`]. Rejections are ordinary outcomes, not errors; store
    /// failures surface as [`RejectReason::StoreUnavailable`] and are never
    /// reported as success.
    pub async fn validate(
        &self,
        raw: &str,
        student_id: i64,
        meta: &ClientMeta,
        now: i64,
    ) -> Verdict {
        // Step 1: decode. Nothing else is consulted for garbage input.
        let payload = match codec::decode(raw) {
            Ok(payload) => payload,
            Err(e) => {
                self.ledger.record(
                    SecurityEventKind::MalformedPayload,
                    format!("{e}: {:?} ({meta})", snippet(raw)),
                );
                return Verdict::Rejected(RejectReason::MalformedPayload);
            }
        };

        // Whether the payload's own stamp still claims to be inside the
        // window. Decides if a failed lookup is an honest re-scan of an old
        // code or something worth ledgering. The stamp is unvalidated client
        // input, so all arithmetic on it saturates.
        let claims_fresh = now <= payload.created_at.saturating_add(self.validity_window_secs);

        // Step 2: the registry is the liveness authority.
        let session = match self.registry.lookup_at(payload.class_id, &payload.token, now) {
            Lookup::Active(session) => session,
            Lookup::Expired(stale) => {
                if claims_fresh {
                    self.ledger.record(
                        SecurityEventKind::ExpiredSession,
                        format!(
                            "stale token for session {} carried fresh-looking timestamp {} ({meta})",
                            stale.attendance_session_id, payload.created_at
                        ),
                    );
                }
                return Verdict::Rejected(RejectReason::ExpiredSession);
            }
            Lookup::Missing => {
                if !claims_fresh {
                    // Old code re-scanned after its window; the registry has
                    // long dropped it. Expected traffic, not an anomaly.
                    return Verdict::Rejected(RejectReason::ExpiredSession);
                }
                self.ledger.record(
                    SecurityEventKind::UnknownSession,
                    format!(
                        "no active session for class {} token {:?} ({meta})",
                        payload.class_id,
                        snippet(&payload.token)
                    ),
                );
                return Verdict::Rejected(RejectReason::UnknownSession);
            }
        };

        // Step 3: the embedded stamp must agree with what the registry
        // recorded and with the attempt time. A live token with an edited
        // stamp is the classic replay-extension attempt.
        let drift = payload.created_at.saturating_sub(session.created_at).saturating_abs();
        let age = now.saturating_sub(payload.created_at).saturating_abs();
        if drift > TIMESTAMP_TOLERANCE_SECS || age > self.validity_window_secs {
            self.ledger.record(
                SecurityEventKind::TimestampSkew,
                format!(
                    "embedded timestamp {} vs session created {} at attempt time {now} ({meta})",
                    payload.created_at, session.created_at
                ),
            );
            return Verdict::Rejected(RejectReason::TimestampSkew);
        }

        // Step 4: durable insert, unique per (session, subject). The store's
        // constraint is what makes racing duplicates collapse to one row.
        match self
            .store
            .insert_attendance_if_absent(session.attendance_session_id, student_id, meta)
            .await
        {
            Ok(InsertOutcome::Inserted) => {
                tracing::info!(
                    "✅ Attendance recorded: student={} class={} session={}",
                    student_id,
                    session.class_id,
                    session.attendance_session_id
                );
                Verdict::Accepted
            }
            Ok(InsertOutcome::Conflict) => Verdict::Rejected(RejectReason::DuplicateRedemption),
            Err(e) => {
                tracing::error!(
                    "❌ Attendance insert failed: student={} session={}: {}",
                    student_id,
                    session.attendance_session_id,
                    e
                );
                Verdict::Rejected(RejectReason::StoreUnavailable)
            }
        }
    }
}

fn snippet(raw: &str) -> String {
    if raw.chars().count() <= DETAIL_SNIPPET_LEN {
        raw.to_string()
    } else {
        let cut: String = raw.chars().take(DETAIL_SNIPPET_LEN).collect();
        format!("{cut}…")
    }
}
