use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

/// Generates a session token from the operating system's CSPRNG.
///
/// Tokens are alphanumeric so they can never collide with the colon
/// separators of the QR wire format. At the minimum length of 16 the space is
/// 62^16, far beyond anything guessable inside a validity window.
///
/// # Arguments
///
/// * `length` - Number of characters to generate.
///
/// # Returns
///
/// A fresh random token string.
pub fn generate(length: usize) -> String {
    OsRng
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_requested_length() {
        assert_eq!(generate(16).len(), 16);
        assert_eq!(generate(32).len(), 32);
    }

    #[test]
    fn emits_only_alphanumerics() {
        let token = generate(64);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn consecutive_tokens_differ() {
        // 62^16 outcomes; a collision here would point at a broken RNG hookup.
        assert_ne!(generate(16), generate(16));
    }
}
