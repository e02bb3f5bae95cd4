use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Decode the claims segment of a JWT without verifying the signature.
///
/// Only the server verifies tokens; the client just reads `exp` to avoid
/// sending requests with a token that has obviously expired.
#[must_use]
pub fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// The `exp` claim of a token, if present.
#[must_use]
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode_claims(token)?.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}

/// Local validity check: the token must decode to a non-empty claim set,
/// and must not be past its `exp` claim when it has one.
#[must_use]
pub fn is_token_valid(token: &str, now: DateTime<Utc>) -> bool {
    let Some(claims) = decode_claims(token) else {
        return false;
    };
    if claims.is_empty() {
        return false;
    }
    match claims.get("exp") {
        None => true,
        Some(exp) => exp.as_i64().is_some_and(|exp| exp > now.timestamp()),
    }
}
