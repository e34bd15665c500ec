//! Webhook HMAC-SHA256 signing and verification.
//!
//! The signature proves the sender holds the shared secret without
//! encrypting the body: `sha256=` followed by the lowercase hex HMAC of
//! the raw request bytes. Verification compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header-value prefix for SHA-256 signatures.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the signature header value for a raw payload.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify a received signature header against the raw body.
///
/// Returns `false` for a missing prefix, a wrong length, or any byte
/// mismatch. The comparison itself is constant-time over the full header
/// value.
pub fn verify_signature(secret: &str, body: &[u8], header: &str) -> bool {
    let expected = sign_payload(secret, body);
    constant_time_eq(expected.as_bytes(), header.as_bytes())
}

/// Constant-time byte comparison. Length is compared first (length is not
/// secret); all content bytes are always examined.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"event_type":"new_student","admission_number":"a1"}"#;

    #[test]
    fn sign_and_verify_round_trip() {
        let signature = sign_payload("s3cret", BODY);
        assert!(signature.starts_with("sha256="));
        assert!(verify_signature("s3cret", BODY, &signature));
    }

    #[test]
    fn wrong_secret_fails() {
        let signature = sign_payload("s3cret", BODY);
        assert!(!verify_signature("other", BODY, &signature));
    }

    #[test]
    fn tampered_body_fails() {
        let signature = sign_payload("s3cret", BODY);
        assert!(!verify_signature("s3cret", b"tampered", &signature));
    }

    #[test]
    fn malformed_header_fails() {
        assert!(!verify_signature("s3cret", BODY, "sha256=zz"));
        assert!(!verify_signature("s3cret", BODY, ""));
    }

    #[test]
    fn signature_is_deterministic_hex() {
        let a = sign_payload("s3cret", BODY);
        let b = sign_payload("s3cret", BODY);
        assert_eq!(a, b);
        // "sha256=" + 32 bytes of hex.
        assert_eq!(a.len(), 7 + 64);
        assert!(a[7..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
