//! Security utilities for token comparison and relay request signing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compares a presented payment token against the stored one in constant time.
pub fn verify_token(presented: &str, stored: &str) -> bool {
    presented.trim().as_bytes().ct_eq(stored.as_bytes()).into()
}

/// Signs a relay payload using HMAC-SHA256, hex encoded.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    // HMAC accepts keys of any length, so this never fails.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a relay signature using constant-time comparison.
pub fn verify_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let expected = sign_payload(payload, secret);
    !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
}
