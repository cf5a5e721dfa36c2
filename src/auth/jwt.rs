//! Best-effort local inspection of the bearer token's expiry claim.
//!
//! This exists purely to avoid dispatching requests that are guaranteed to
//! fail with a 401. It is NOT a security check - the backend independently
//! validates every token - so the decoder never verifies signatures and
//! treats anything it cannot parse as already expired.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Claims {
    exp: i64,
}

/// Returns true when the token's `exp` claim is in the past, or when the
/// token cannot be decoded at all. Never panics, never errors.
pub fn is_expired(token: &str) -> bool {
    match expiry(token) {
        Some(exp) => exp <= Utc::now(),
        None => true,
    }
}

fn expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp, 0)
}
