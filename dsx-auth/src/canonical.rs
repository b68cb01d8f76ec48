//! Canonical message construction for request signing.
//!
//! The signature covers method, path+query, timestamp, and nonce as well as
//! the body, so a captured signed body cannot be replayed against a
//! different endpoint.

use crate::authn::SignatureError;

/// Field separator in the canonical message.
///
/// The separator must not appear unescaped inside any field: the timestamp
/// is an integer and the nonce is base64, so neither can contain it, and a
/// path containing it is rejected rather than escaped.
pub const FIELD_SEPARATOR: char = '|';

/// Build the canonical byte string used as HMAC input.
///
/// Layout: `METHOD|path_q|timestamp|nonce|` followed by the raw body bytes.
/// The method is normalized to upper case before joining.
///
/// # Errors
///
/// Returns [`SignatureError::MalformedHeader`] if the method, path, or
/// nonce contains the field separator. Callers should reject such paths
/// upstream as invalid input; this check is the backstop.
pub fn canonical_message(
    method: &str,
    path_q: &str,
    timestamp: i64,
    nonce: &str,
    body: &[u8],
) -> Result<Vec<u8>, SignatureError> {
    let method = method.to_ascii_uppercase();
    if method.contains(FIELD_SEPARATOR)
        || path_q.contains(FIELD_SEPARATOR)
        || nonce.contains(FIELD_SEPARATOR)
    {
        return Err(SignatureError::MalformedHeader);
    }

    let ts = timestamp.to_string();
    let mut msg =
        Vec::with_capacity(method.len() + path_q.len() + ts.len() + nonce.len() + 4 + body.len());
    msg.extend_from_slice(method.as_bytes());
    msg.push(FIELD_SEPARATOR as u8);
    msg.extend_from_slice(path_q.as_bytes());
    msg.push(FIELD_SEPARATOR as u8);
    msg.extend_from_slice(ts.as_bytes());
    msg.push(FIELD_SEPARATOR as u8);
    msg.extend_from_slice(nonce.as_bytes());
    msg.push(FIELD_SEPARATOR as u8);
    msg.extend_from_slice(body);

    Ok(msg)
}
