//! Session password derivation.
//!
//! The box never receives the app token itself. A session is opened by
//! sending `hex(HMAC-SHA1(key = app_token, message = challenge))`, where the
//! challenge is the single-use nonce returned by `GET login/`.

use ring::hmac;

/// Computes the session password for a challenge.
pub fn session_password(app_token: &str, challenge: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, app_token.as_bytes());
    let tag = hmac::sign(&key, challenge.as_bytes());
    hex::encode(tag.as_ref())
}

// Lowercase hex, as the box expects
mod hex {
    pub fn encode(data: &[u8]) -> String {
        data.iter().map(|b| format!("{b:02x}")).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
