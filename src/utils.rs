//! Identifier and digest helpers

use super::error::{Error, Result};
use bech32::Bech32m;
use uuid7::uuid7;

pub const HOTEL_HRP: &str = "hotel_";
pub const BOOKING_HRP: &str = "booking_";
pub const USER_HRP: &str = "user_";
pub const ROOM_HRP: &str = "room_";

// construct a unique record id then encode using bech32
pub fn new_id(hrp: &str) -> Result<String> {
    let hrp = bech32::Hrp::parse(hrp).map_err(|e| Error::Internal(e.to_string()))?;
    bech32::encode::<Bech32m>(hrp, uuid7().as_bytes()).map_err(|e| Error::Internal(e.to_string()))
}

pub fn password_digest(password: &str) -> String {
    sha256::digest(password)
}

/// Refresh tokens are kept as digests, never verbatim.
pub fn token_digest(token: &str) -> String {
    sha256::digest(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix_and_are_unique() {
        let a = new_id(HOTEL_HRP).unwrap();
        let b = new_id(HOTEL_HRP).unwrap();

        assert!(a.starts_with("hotel_1"));
        assert_ne!(a, b);
    }

    #[test]
    fn empty_prefix_is_rejected() {
        assert!(new_id("").is_err());
    }

    #[test]
    fn digest_is_stable() {
        assert_eq!(password_digest("secret"), password_digest("secret"));
        assert_ne!(password_digest("secret"), password_digest("Secret"));
    }
}
