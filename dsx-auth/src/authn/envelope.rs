//! Wire codec for the signed-request authorization header.
//!
//! Format: `DSX-HMAC key_id=<kid>, ts=<epoch-seconds>, nonce=<b64>, sig=<b64>`
//!
//! Fields are comma-separated `key=value` pairs after a fixed scheme
//! prefix. Order is not significant on receipt but is emitted in the order
//! shown for interoperability with simple parsers.

use super::error::SignatureError;

/// Authorization scheme prefix for signed requests.
pub const SCHEME: &str = "DSX-HMAC";

/// Parsed signed-request envelope. Ephemeral: constructed per request by
/// the signer, consumed and discarded by the verifier, never persisted.
///
/// # Note on Public Fields
///
/// Fields are intentionally public; this is a data transfer object.
/// Parsing an envelope does NOT authenticate it — always run verification
/// before trusting the key id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequestEnvelope {
    /// Identifies which connector credential signed the request.
    pub key_id: String,
    /// Unix timestamp in seconds at signing time.
    pub timestamp: i64,
    /// Random nonce, base64.
    pub nonce: String,
    /// Base64 HMAC-SHA256 digest over the canonical message.
    pub signature: String,
}

impl SignedRequestEnvelope {
    /// Render the envelope as a single header value.
    #[must_use]
    pub fn to_header(&self) -> String {
        format!(
            "{} key_id={}, ts={}, nonce={}, sig={}",
            SCHEME, self.key_id, self.timestamp, self.nonce, self.signature
        )
    }

    /// Parse a header value into an envelope.
    ///
    /// Pairs are split on the first `=` only, since base64 padding may
    /// contain `=`. Unrecognized fields are ignored.
    ///
    /// # Errors
    ///
    /// - [`SignatureError::MalformedHeader`] if the scheme prefix is wrong
    ///   or `ts`, `nonce`, or `sig` is missing or unparsable.
    /// - [`SignatureError::MissingKeyId`] if `key_id` is absent or empty.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let rest = header
            .strip_prefix(SCHEME)
            .ok_or(SignatureError::MalformedHeader)?;
        if !rest.starts_with(' ') {
            return Err(SignatureError::MalformedHeader);
        }

        let mut key_id = None;
        let mut ts = None;
        let mut nonce = None;
        let mut sig = None;

        for pair in rest.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let Some((name, value)) = pair.split_once('=') else {
                return Err(SignatureError::MalformedHeader);
            };
            match name.trim() {
                "key_id" => key_id = Some(value.to_string()),
                "ts" => ts = Some(value.to_string()),
                "nonce" => nonce = Some(value.to_string()),
                "sig" => sig = Some(value.to_string()),
                _ => {}
            }
        }

        let key_id = match key_id {
            Some(kid) if !kid.is_empty() => kid,
            _ => return Err(SignatureError::MissingKeyId),
        };
        let timestamp = ts
            .ok_or(SignatureError::MalformedHeader)?
            .parse::<i64>()
            .map_err(|_| SignatureError::MalformedHeader)?;
        let nonce = nonce.ok_or(SignatureError::MalformedHeader)?;
        let signature = sig.ok_or(SignatureError::MalformedHeader)?;

        Ok(Self {
            key_id,
            timestamp,
            nonce,
            signature,
        })
    }
}
