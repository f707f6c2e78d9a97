//! HMAC signatures for inbound payment confirmations.
//!
//! The sender signs `"<timestamp>.<raw body>"` with HMAC-SHA256 and sends the hex
//! digest in `x-signature` and the unix timestamp in `x-timestamp`.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance_secs: u64,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.as_bytes()).ok()
    }

    /// Hex HMAC for a payload signed at `timestamp`.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Option<String> {
        let mut mac = self.mac()?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    /// Checks the signature headers against the raw body at `now` (unix seconds).
    pub fn verify(&self, headers: &HeaderMap, body: &[u8], now: i64) -> bool {
        let (Some(ts), Some(sig)) = (
            headers.get(TIMESTAMP_HEADER).and_then(|v| v.to_str().ok()),
            headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()),
        ) else {
            return false;
        };

        let Ok(ts_secs) = ts.trim().parse::<i64>() else {
            return false;
        };
        if (now - ts_secs).unsigned_abs() > self.tolerance_secs {
            return false;
        }

        match self.sign(ts.trim(), body) {
            Some(expected) => constant_time_eq(&expected, sig.trim()),
            None => false,
        }
    }
}

pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
