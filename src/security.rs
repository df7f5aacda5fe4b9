use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

/// Header the gateway relay puts its shared secret in.
pub const RELAY_SECRET_HEADER: &str = "x-relay-secret";

/// Constant-time string comparison. Length differences still return early.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Whether the request carries the relay secret. A missing header, or one
/// that is not valid UTF-8, fails.
pub fn verify_relay_secret(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(RELAY_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|provided| constant_time_compare(provided, expected))
}
