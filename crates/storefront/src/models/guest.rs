//! Guest checkout records.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

/// How long a guest may take to claim their orders with an account.
pub const CONVERT_TOKEN_TTL_DAYS: i64 = 7;

/// A customer who checked out without an account, keyed by email.
#[derive(Debug, Clone)]
pub struct GuestUser {
    pub email: String,
    pub name: String,
    pub phone: String,
    /// Single-use token that lets the guest attach orders to a new account.
    pub convert_token: String,
    pub token_expiry: DateTime<Utc>,
}

impl GuestUser {
    #[must_use]
    pub fn token_is_valid(&self, now: DateTime<Utc>) -> bool {
        self.token_expiry > now
    }
}

/// Fresh convert token: 32 random bytes, hex encoded.
#[must_use]
pub fn generate_convert_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Expiry for a token issued at `now`.
#[must_use]
pub fn convert_token_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(CONVERT_TOKEN_TTL_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_token_is_64_hex_chars() {
        let token = generate_convert_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_convert_token());
    }

    #[test]
    fn test_token_validity_window() {
        let now = Utc::now();
        let guest = GuestUser {
            email: "guest@example.com".to_string(),
            name: "Guest".to_string(),
            phone: "555".to_string(),
            convert_token: generate_convert_token(),
            token_expiry: convert_token_expiry(now),
        };
        assert!(guest.token_is_valid(now + Duration::days(6)));
        assert!(!guest.token_is_valid(now + Duration::days(8)));
    }
}
