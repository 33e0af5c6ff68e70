//! Webhook signature verification (`X-Line-Signature`)

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Channel secret is not configured")]
    MissingSecret,

    #[error("Signature is not valid base64")]
    Malformed,

    #[error("Signature does not match request body")]
    Mismatch,
}

/// Compute the base64 HMAC-SHA256 of `body` keyed with the channel secret
#[cfg(test)]
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .map_err(|_| SignatureError::MissingSecret)?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a signature header value against the raw request body
pub fn verify(channel_secret: &str, body: &[u8], signature: &str) -> Result<(), SignatureError> {
    if channel_secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }

    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| SignatureError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .map_err(|_| SignatureError::MissingSecret)?;
    mac.update(body);
    // verify_slice compares in constant time
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}
