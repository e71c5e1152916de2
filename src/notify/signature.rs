//! HMAC-SHA256 webhook signatures.
//!
//! The signature covers the exact body bytes, so the receiver must verify
//! against the raw request body rather than a re-serialized copy.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Compute the lowercase hex HMAC-SHA256 of `body` under `secret`.
///
/// # Errors
///
/// Returns `AppError::Notify` if the HMAC cannot be keyed.
pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| AppError::Notify(format!("failed to initialize hmac: {err}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex signature against `body` in constant time.
///
/// Returns `false` on malformed hex or a wrong-length digest.
#[must_use]
pub fn verify(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    // SHA-256 produces 32-byte signatures.
    if expected.len() != 32 {
        return false;
    }
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
