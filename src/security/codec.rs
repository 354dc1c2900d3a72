use thiserror::Error;

/// Literal prefix carried by every QR payload.
pub const PAYLOAD_PREFIX: &str = "ATTEND";

/// Decoded form of a QR payload.
///
/// The wire format is `ATTEND:<class_id>:<token>:<created_at>`, exactly four
/// colon-separated fields. Because the separator is a colon, tokens must never
/// contain one; the generator only emits alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPayload {
    /// The class the session was opened for.
    pub class_id: i64,
    /// The opaque session token, as printed into the QR code.
    pub token: String,
    /// Unix timestamp (seconds) embedded at generation time.
    pub created_at: i64,
}

/// Why a scanned string failed to decode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("missing ATTEND prefix")]
    MissingPrefix,
    #[error("expected 4 fields, got {0}")]
    FieldCount(usize),
    #[error("class id is not an integer")]
    BadClassId,
    #[error("timestamp is not an integer")]
    BadTimestamp,
    #[error("token is empty")]
    EmptyToken,
}

/// Renders a payload string for a freshly opened session.
pub fn encode(class_id: i64, token: &str, created_at: i64) -> String {
    format!("{PAYLOAD_PREFIX}:{class_id}:{token}:{created_at}")
}

/// Parses a scanned QR string back into a [`QrPayload`].
///
/// # Arguments
///
/// * `raw` - The exact string read out of the QR code.
///
/// # Returns
///
/// The decoded payload, or a [`PayloadError`] naming the first field that
/// failed. Decoding never touches session state; callers decide what a
/// failure means.
pub fn decode(raw: &str) -> Result<QrPayload, PayloadError> {
    if !raw.starts_with(PAYLOAD_PREFIX) {
        return Err(PayloadError::MissingPrefix);
    }

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 4 {
        return Err(PayloadError::FieldCount(parts.len()));
    }
    if parts[0] != PAYLOAD_PREFIX {
        return Err(PayloadError::MissingPrefix);
    }

    let class_id: i64 = parts[1].parse().map_err(|_| PayloadError::BadClassId)?;
    let token = parts[2];
    if token.is_empty() {
        return Err(PayloadError::EmptyToken);
    }
    let created_at: i64 = parts[3].parse().map_err(|_| PayloadError::BadTimestamp)?;

    Ok(QrPayload {
        class_id,
        token: token.to_string(),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_four_colon_separated_fields() {
        assert_eq!(encode(1, "Zx9YtK3mQw7RfB2n", 1000), "ATTEND:1:Zx9YtK3mQw7RfB2n:1000");
    }

    #[test]
    fn decodes_what_encode_produced() {
        let raw = encode(42, "Zx9YtK3mQw7RfB2n", 1_700_000_000);
        let payload = decode(&raw).unwrap();
        assert_eq!(payload.class_id, 42);
        assert_eq!(payload.token, "Zx9YtK3mQw7RfB2n");
        assert_eq!(payload.created_at, 1_700_000_000);
    }

    #[test]
    fn rejects_missing_prefix() {
        assert_eq!(decode("BOGUS:1:tok:1000"), Err(PayloadError::MissingPrefix));
        assert_eq!(decode(""), Err(PayloadError::MissingPrefix));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(decode("ATTEND:1:tok"), Err(PayloadError::FieldCount(3)));
        assert_eq!(decode("ATTEND:1:tok:1000:extra"), Err(PayloadError::FieldCount(5)));
        // A trailing colon means a fifth, empty field.
        assert_eq!(decode("ATTEND:1:tok:1000:"), Err(PayloadError::FieldCount(5)));
    }

    #[test]
    fn rejects_non_numeric_class_id() {
        assert_eq!(decode("ATTEND:abc:tok:1000"), Err(PayloadError::BadClassId));
    }

    #[test]
    fn rejects_non_numeric_timestamp() {
        assert_eq!(decode("ATTEND:1:tok:later"), Err(PayloadError::BadTimestamp));
    }

    #[test]
    fn rejects_empty_token() {
        assert_eq!(decode("ATTEND:1::1000"), Err(PayloadError::EmptyToken));
    }

    #[test]
    fn prefix_must_be_exact_first_field() {
        // Starts with ATTEND but the first field carries extra characters.
        assert_eq!(decode("ATTENDx:1:tok:1000"), Err(PayloadError::MissingPrefix));
    }

    #[test]
    fn accepts_negative_timestamps_as_integers() {
        // Freshness is judged by the engine, not the codec.
        let payload = decode("ATTEND:1:tok:-5").unwrap();
        assert_eq!(payload.created_at, -5);
    }
}
