//! Request signing.

use base64::prelude::*;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::canonical::canonical_message;
use crate::clock::unix_now;
use crate::secret::SigningSecret;

use super::envelope::SignedRequestEnvelope;
use super::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Nonce entropy in bytes.
const NONCE_LEN: usize = 16;

/// Generate a random nonce: 16 bytes of OS randomness, base64.
#[must_use]
pub fn random_nonce() -> String {
    let mut bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut bytes);
    BASE64_STANDARD.encode(bytes)
}

/// Compute the HMAC-SHA256 digest over a canonical message.
pub(crate) fn compute_mac(secret: &SigningSecret, message: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.expose()).expect("HMAC accepts any key length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Sign a request with an explicit timestamp and nonce.
///
/// Returns the full authorization header value:
/// `DSX-HMAC key_id=<kid>, ts=<epoch-seconds>, nonce=<b64>, sig=<b64>`.
///
/// # Errors
///
/// Returns [`SignatureError::MalformedHeader`] if the method, path, or
/// nonce contains the canonical field separator.
pub fn sign_request(
    key_id: &str,
    secret: &SigningSecret,
    method: &str,
    path_q: &str,
    body: &[u8],
    timestamp: i64,
    nonce: &str,
) -> Result<String, SignatureError> {
    let message = canonical_message(method, path_q, timestamp, nonce, body)?;
    let signature = BASE64_STANDARD.encode(compute_mac(secret, &message));
    Ok(SignedRequestEnvelope {
        key_id: key_id.to_string(),
        timestamp,
        nonce: nonce.to_string(),
        signature,
    }
    .to_header())
}

/// Sign a request with the current wall-clock time and a fresh random nonce.
///
/// # Errors
///
/// See [`sign_request`].
pub fn sign_request_now(
    key_id: &str,
    secret: &SigningSecret,
    method: &str,
    path_q: &str,
    body: &[u8],
) -> Result<String, SignatureError> {
    sign_request(key_id, secret, method, path_q, body, unix_now(), &random_nonce())
}
