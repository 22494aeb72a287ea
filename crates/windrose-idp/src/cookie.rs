//! Short-lived authentication handoff cookie.
//!
//! The cookie carries `sessionID:authnContextRef`, reversibly encoded; the
//! server holds no durable copy beyond the session cache entry it unlocks.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Build a `Set-Cookie` value binding a session identifier to the
/// authentication context reference that produced it. Expiry matches the
/// lifetime of the login handoff, not the assertion.
#[must_use]
pub fn encode(name: &str, session_id: &str, authn_ref: &str, ttl_minutes: i64) -> String {
    let payload = STANDARD.encode(format!("{session_id}:{authn_ref}"));
    let expires = http_date(Utc::now() + Duration::minutes(ttl_minutes));
    format!("{name}={payload}; Path=/; Expires={expires}")
}

/// Decode the named cookie from a `Cookie` request header.
///
/// Lenient: a missing cookie, bad base64, bad UTF-8 or a payload without the
/// `:` separator all yield `None`.
#[must_use]
pub fn decode(header: &str, name: &str) -> Option<(String, String)> {
    for part in header.split(';') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        if key.trim() != name {
            continue;
        }
        let raw = STANDARD.decode(value.trim()).ok()?;
        let text = String::from_utf8(raw).ok()?;
        let (session_id, authn_ref) = text.split_once(':')?;
        return Some((session_id.to_string(), authn_ref.to_string()));
    }
    None
}

/// A `Set-Cookie` value that immediately expires the named cookie.
#[must_use]
pub fn delete(name: &str) -> String {
    format!(
        "{name}=; Path=/; Expires={}",
        http_date(DateTime::UNIX_EPOCH)
    )
}
