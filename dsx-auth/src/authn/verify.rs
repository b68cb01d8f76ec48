//! Signed-request verification.

use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::canonical::canonical_message;
use crate::secret::SigningSecret;

use super::envelope::SignedRequestEnvelope;
use super::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Trait for resolving a signing secret from a key id.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` for concurrent verification.
///
/// # Errors
///
/// `Ok(None)` means the key id is definitively unknown (an auth failure).
/// `Err` means the backing store could not be consulted (an infrastructure
/// fault). The two must never be conflated.
pub trait SecretResolver: Send + Sync {
    /// Look up the signing secret for a key id.
    fn secret_for_key_id(&self, key_id: &str) -> Result<Option<SigningSecret>, ResolverUnavailable>;
}

/// The secret lookup could not reach its backing store.
///
/// The detail string must not contain secrets or tokens.
#[derive(Debug, Clone, thiserror::Error)]
#[error("secret lookup unavailable: {0}")]
pub struct ResolverUnavailable(pub String);

/// Result of successful signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedHmac {
    key_id: String,
}

impl VerifiedHmac {
    /// Crate-private so a `VerifiedHmac` can only come out of
    /// [`verify_request`], which performs the cryptographic checks.
    pub(crate) fn new(key_id: String) -> Self {
        Self { key_id }
    }

    /// The key id whose secret produced a matching signature.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Consume and return the key id.
    #[must_use]
    pub fn into_key_id(self) -> String {
        self.key_id
    }
}

/// Verify a parsed envelope against a known secret.
///
/// Checks, in order: timestamp skew (inclusive window, both directions),
/// then the HMAC over the canonical message, compared in constant time.
///
/// This is the core used by [`verify_request`]; callers that already
/// resolved the secret (and want the connector identity from the same
/// lookup) can parse the header themselves and call this directly.
///
/// # Errors
///
/// - [`SignatureError::StaleRequest`] if `|now - ts| > max_skew_seconds`.
/// - [`SignatureError::BadSignature`] on any digest mismatch.
/// - [`SignatureError::MalformedHeader`] if a signed field contains the
///   canonical separator.
#[must_use = "verification result must be checked"]
pub fn verify_envelope(
    method: &str,
    path_q: &str,
    body: &[u8],
    envelope: &SignedRequestEnvelope,
    secret: &SigningSecret,
    now: i64,
    max_skew_seconds: i64,
) -> Result<(), SignatureError> {
    // Saturating arithmetic handles extreme timestamps; both directions are
    // checked so forged future timestamps are rejected too.
    if now.saturating_sub(envelope.timestamp) > max_skew_seconds
        || envelope.timestamp.saturating_sub(now) > max_skew_seconds
    {
        return Err(SignatureError::StaleRequest);
    }

    let message = canonical_message(method, path_q, envelope.timestamp, &envelope.nonce, body)?;

    // Decode the presented signature; on invalid base64 compare against
    // zeros so the code path stays uniform.
    let presented = BASE64_STANDARD
        .decode(&envelope.signature)
        .unwrap_or_else(|_| vec![0u8; 32]);

    let mut mac =
        HmacSha256::new_from_slice(secret.expose()).expect("HMAC accepts any key length");
    mac.update(&message);
    // verify_slice compares in constant time
    mac.verify_slice(&presented)
        .map_err(|_| SignatureError::BadSignature)?;

    Ok(())
}

/// Verify a signed request header end to end.
///
/// Parses the header, resolves the secret for its key id, checks the skew
/// window, and recomputes the signature. On success returns the verified
/// key id so the caller can attach connector identity to the request
/// context.
///
/// Replay of a still-fresh nonce is NOT detected here; the hub applies a
/// [`super::ReplayGuard`] after this check succeeds.
///
/// # Errors
///
/// - [`SignatureError::MalformedHeader`] / [`SignatureError::MissingKeyId`]
///   from header parsing.
/// - [`SignatureError::UnknownKeyId`] if the resolver has no secret for the
///   key id.
/// - [`SignatureError::StoreUnavailable`] if the resolver itself failed.
/// - [`SignatureError::StaleRequest`] / [`SignatureError::BadSignature`]
///   from envelope verification.
#[must_use = "verification result must be checked"]
pub fn verify_request(
    method: &str,
    path_q: &str,
    body: &[u8],
    header: &str,
    resolver: &impl SecretResolver,
    now: i64,
    max_skew_seconds: i64,
) -> Result<VerifiedHmac, SignatureError> {
    let envelope = SignedRequestEnvelope::parse(header)?;

    let secret = resolver
        .secret_for_key_id(&envelope.key_id)
        .map_err(|_| SignatureError::StoreUnavailable)?
        .ok_or(SignatureError::UnknownKeyId)?;

    verify_envelope(method, path_q, body, &envelope, &secret, now, max_skew_seconds)?;

    Ok(VerifiedHmac::new(envelope.key_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authn::sign::sign_request;
    use std::collections::HashMap;

    /// Test resolver backed by a plain map.
    struct MapResolver(HashMap<String, SigningSecret>);

    impl MapResolver {
        fn with(key_id: &str, secret: &str) -> Self {
            let mut map = HashMap::new();
            map.insert(key_id.to_string(), SigningSecret::new(secret));
            Self(map)
        }
    }

    impl SecretResolver for MapResolver {
        fn secret_for_key_id(
            &self,
            key_id: &str,
        ) -> Result<Option<SigningSecret>, ResolverUnavailable> {
            Ok(self.0.get(key_id).cloned())
        }
    }

    /// Test resolver that always fails, as if the store were down.
    struct DownResolver;

    impl SecretResolver for DownResolver {
        fn secret_for_key_id(
            &self,
            _key_id: &str,
        ) -> Result<Option<SigningSecret>, ResolverUnavailable> {
            Err(ResolverUnavailable("store down".to_string()))
        }
    }

    const NOW: i64 = 1700000000;
    const SKEW: i64 = 60;

    fn signed(key_id: &str, secret: &str, method: &str, path: &str, body: &[u8]) -> String {
        sign_request(key_id, &SigningSecret::new(secret), method, path, body, NOW, "abc").unwrap()
    }

    #[test]
    fn test_round_trip_returns_key_id() {
        let header = signed("kid1", "s3cr3t", "POST", "/v1/scan", b"{}");
        let resolver = MapResolver::with("kid1", "s3cr3t");
        let verified =
            verify_request("POST", "/v1/scan", b"{}", &header, &resolver, NOW, SKEW).unwrap();
        assert_eq!(verified.key_id(), "kid1");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = signed("kid1", "s3cr3t", "POST", "/v1/scan", b"{}");
        let resolver = MapResolver::with("kid1", "wrong");
        let result = verify_request("POST", "/v1/scan", b"{}", &header, &resolver, NOW, SKEW);
        assert_eq!(result.unwrap_err(), SignatureError::BadSignature);
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = signed("kid1", "s3cr3t", "POST", "/v1/scan", b"{}");
        let resolver = MapResolver::with("kid1", "s3cr3t");
        let result = verify_request("POST", "/v1/scan", b"{!}", &header, &resolver, NOW, SKEW);
        assert_eq!(result.unwrap_err(), SignatureError::BadSignature);
    }

    #[test]
    fn test_tampered_path_rejected() {
        let header = signed("kid1", "s3cr3t", "POST", "/v1/scan", b"{}");
        let resolver = MapResolver::with("kid1", "s3cr3t");
        let result = verify_request("POST", "/v1/other", b"{}", &header, &resolver, NOW, SKEW);
        assert_eq!(result.unwrap_err(), SignatureError::BadSignature);
    }

    #[test]
    fn test_tampered_method_rejected() {
        let header = signed("kid1", "s3cr3t", "POST", "/v1/scan", b"{}");
        let resolver = MapResolver::with("kid1", "s3cr3t");
        let result = verify_request("DELETE", "/v1/scan", b"{}", &header, &resolver, NOW, SKEW);
        assert_eq!(result.unwrap_err(), SignatureError::BadSignature);
    }

    #[test]
    fn test_method_case_insensitive_on_both_sides() {
        let secret = SigningSecret::new("s3cr3t");
        let header =
            sign_request("kid1", &secret, "post", "/v1/scan", b"{}", NOW, "abc").unwrap();
        let resolver = MapResolver::with("kid1", "s3cr3t");
        assert!(verify_request("POST", "/v1/scan", b"{}", &header, &resolver, NOW, SKEW).is_ok());
    }

    #[test]
    fn test_unknown_key_id() {
        let header = signed("kid1", "s3cr3t", "GET", "/v1/x", b"");
        let resolver = MapResolver::with("other", "s3cr3t");
        let result = verify_request("GET", "/v1/x", b"", &header, &resolver, NOW, SKEW);
        assert_eq!(result.unwrap_err(), SignatureError::UnknownKeyId);
    }

    #[test]
    fn test_store_unavailable_distinct_from_unknown() {
        let header = signed("kid1", "s3cr3t", "GET", "/v1/x", b"");
        let result = verify_request("GET", "/v1/x", b"", &header, &DownResolver, NOW, SKEW);
        assert_eq!(result.unwrap_err(), SignatureError::StoreUnavailable);
    }

    #[test]
    fn test_skew_boundary_inclusive() {
        let resolver = MapResolver::with("kid1", "s3cr3t");
        let secret = SigningSecret::new("s3cr3t");

        // Exactly at the boundary: accepted, both directions.
        for ts in [NOW - SKEW, NOW + SKEW] {
            let header = sign_request("kid1", &secret, "GET", "/x", b"", ts, "n").unwrap();
            assert!(
                verify_request("GET", "/x", b"", &header, &resolver, NOW, SKEW).is_ok(),
                "timestamp at boundary should be accepted"
            );
        }

        // One second beyond: rejected, both directions.
        for ts in [NOW - SKEW - 1, NOW + SKEW + 1] {
            let header = sign_request("kid1", &secret, "GET", "/x", b"", ts, "n").unwrap();
            let result = verify_request("GET", "/x", b"", &header, &resolver, NOW, SKEW);
            assert_eq!(result.unwrap_err(), SignatureError::StaleRequest);
        }
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        let resolver = MapResolver::with("kid1", "s3cr3t");
        let secret = SigningSecret::new("s3cr3t");
        for ts in [0, i64::MAX, i64::MIN] {
            let header = sign_request("kid1", &secret, "GET", "/x", b"", ts, "n").unwrap();
            let result = verify_request("GET", "/x", b"", &header, &resolver, NOW, SKEW);
            assert_eq!(result.unwrap_err(), SignatureError::StaleRequest);
        }
    }

    #[test]
    fn test_garbage_signature_rejected_not_panicking() {
        let resolver = MapResolver::with("kid1", "s3cr3t");
        let header = "DSX-HMAC key_id=kid1, ts=1700000000, nonce=abc, sig=!!not-base64!!";
        let result = verify_request("GET", "/x", b"", header, &resolver, NOW, SKEW);
        assert_eq!(result.unwrap_err(), SignatureError::BadSignature);
    }

    #[test]
    fn test_end_to_end_scenario() {
        // Sign (POST, "/v1/scan", body={}) with "s3cr3t"; same secret
        // verifies to the key id, a different secret fails.
        let secret = SigningSecret::new("s3cr3t");
        let header =
            sign_request("kid9", &secret, "POST", "/v1/scan", b"{}", NOW, "abc").unwrap();

        let good = MapResolver::with("kid9", "s3cr3t");
        let verified =
            verify_request("POST", "/v1/scan", b"{}", &header, &good, NOW, SKEW).unwrap();
        assert_eq!(verified.into_key_id(), "kid9");

        let bad = MapResolver::with("kid9", "different");
        let result = verify_request("POST", "/v1/scan", b"{}", &header, &bad, NOW, SKEW);
        assert_eq!(result.unwrap_err(), SignatureError::BadSignature);
    }
}
