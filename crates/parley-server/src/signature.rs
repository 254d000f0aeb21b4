//! LINE webhook signature verification.
//!
//! `X-Line-Signature` carries the base64 HMAC-SHA256 of the raw request body,
//! keyed with the channel secret.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,

    #[error("signature is not valid base64")]
    Malformed,

    #[error("signature mismatch")]
    Mismatch,

    #[error("invalid signing key")]
    InvalidKey,
}

fn mac_for(secret: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(body);
    Ok(mac)
}

/// Base64 signature LINE would send for `body`
pub fn compute_signature(secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mac = mac_for(secret, body)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check a signature header value against the raw body in constant time
pub fn verify_signature(
    secret: &str,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), SignatureError> {
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::Missing)?;
    let expected = STANDARD
        .decode(signature)
        .map_err(|_| SignatureError::Malformed)?;

    mac_for(secret, body)?
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "channel-secret";
    const BODY: &[u8] = br#"{"destination":"U0","events":[]}"#;

    #[test]
    fn test_valid_signature() {
        let sig = compute_signature(SECRET, BODY).unwrap();
        assert!(verify_signature(SECRET, BODY, Some(&sig)).is_ok());
    }

    #[test]
    fn test_tampered_body() {
        let sig = compute_signature(SECRET, BODY).unwrap();
        let tampered = br#"{"destination":"U1","events":[]}"#;
        assert_eq!(
            verify_signature(SECRET, tampered, Some(&sig)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret() {
        let sig = compute_signature("other-secret", BODY).unwrap();
        assert_eq!(
            verify_signature(SECRET, BODY, Some(&sig)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_missing_and_malformed() {
        assert_eq!(verify_signature(SECRET, BODY, None), Err(SignatureError::Missing));
        assert_eq!(verify_signature(SECRET, BODY, Some("  ")), Err(SignatureError::Missing));
        assert_eq!(
            verify_signature(SECRET, BODY, Some("not base64!!")),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn test_known_vector() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let sig = compute_signature("key", b"The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(sig, "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg=");
    }
}
