//! Stateless signed access tokens.
//!
//! A signed token is self-describing: the claims travel with it and the
//! only lifecycle control is the embedded expiry. No store lookup is
//! needed to verify one, which also means it cannot be revoked early -
//! deployments that need revocation use the opaque variant instead.
//!
//! Wire format: `base64url(claims-json) "." base64url(mac)` where
//! `mac = HMAC-SHA256(secret, DOMAIN_PREFIX || claims-json)`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::secret::SigningSecret;

use super::claims::{AccessClaims, ROLE_CONNECTOR};
use super::error::BearerError;

type HmacSha256 = Hmac<Sha256>;

/// Domain separation prefix for token MACs.
///
/// Prevents cross-protocol attacks: a request signature can never pass as
/// a token MAC even under the same secret.
const DOMAIN_PREFIX: &[u8] = b"DSX-TOKEN-v1:";

/// Result of successful bearer verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedBearer {
    subject: Option<String>,
    role: String,
}

impl VerifiedBearer {
    /// Construct a verified result.
    ///
    /// Only token verifiers should call this; holding a `VerifiedBearer`
    /// is treated by callers as proof that verification ran.
    #[must_use]
    pub fn new(subject: Option<String>, role: impl Into<String>) -> Self {
        Self {
            subject,
            role: role.into(),
        }
    }

    /// The subject (connector id) the token was bound to, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The granted role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }
}

fn mac_over(secret: &SigningSecret, payload: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.expose()).expect("HMAC accepts any key length");
    mac.update(DOMAIN_PREFIX);
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Issue a signed token for the connector role.
///
/// `exp = now + ttl_seconds`; `sub` binds the token to a connector id when
/// given.
#[must_use]
pub fn issue_signed_token(
    secret: &SigningSecret,
    issuer: &str,
    audience: &str,
    subject: Option<&str>,
    ttl_seconds: i64,
    now: i64,
) -> String {
    let claims = AccessClaims {
        iss: issuer.to_string(),
        aud: audience.to_string(),
        iat: now,
        exp: now.saturating_add(ttl_seconds),
        role: ROLE_CONNECTOR.to_string(),
        sub: subject.map(str::to_string),
    };
    encode_token(secret, &claims)
}

/// Encode an arbitrary claims set. Exposed for tests that need to build
/// tokens with off-nominal claims.
#[must_use]
pub fn encode_token(secret: &SigningSecret, claims: &AccessClaims) -> String {
    let payload = serde_json::to_vec(claims).expect("claims serialize to JSON");
    let mac = mac_over(secret, &payload);
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&payload),
        URL_SAFE_NO_PAD.encode(mac)
    )
}

/// Verify a signed token.
///
/// Check order is deliberate: the MAC is verified before anything is read
/// out of the payload, so only authentic tokens reach the claim checks,
/// and expiry is checked last so probing with expired tokens learns
/// nothing about what made them valid.
///
/// # Errors
///
/// - [`BearerError::InvalidToken`] on structural, MAC, issuer, or audience
///   failure.
/// - [`BearerError::RoleMismatch`] for an authentic token with a role
///   other than `connector`.
/// - [`BearerError::ExpiredToken`] when `now >= exp`.
#[must_use = "verification result must be checked"]
pub fn verify_signed_token(
    token: &str,
    secret: &SigningSecret,
    expected_issuer: &str,
    expected_audience: &str,
    now: i64,
) -> Result<VerifiedBearer, BearerError> {
    let (payload_b64, mac_b64) = token.split_once('.').ok_or(BearerError::InvalidToken)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| BearerError::InvalidToken)?;
    // On invalid base64 compare against zeros so the code path stays uniform.
    let presented = URL_SAFE_NO_PAD
        .decode(mac_b64)
        .unwrap_or_else(|_| vec![0u8; 32]);

    let mut mac =
        HmacSha256::new_from_slice(secret.expose()).expect("HMAC accepts any key length");
    mac.update(DOMAIN_PREFIX);
    mac.update(&payload);
    // verify_slice compares in constant time
    mac.verify_slice(&presented)
        .map_err(|_| BearerError::InvalidToken)?;

    let claims: AccessClaims =
        serde_json::from_slice(&payload).map_err(|_| BearerError::InvalidToken)?;

    if claims.iss != expected_issuer || claims.aud != expected_audience {
        return Err(BearerError::InvalidToken);
    }
    if claims.role != ROLE_CONNECTOR {
        return Err(BearerError::RoleMismatch);
    }
    if now >= claims.exp {
        return Err(BearerError::ExpiredToken);
    }

    Ok(VerifiedBearer::new(claims.sub, claims.role))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1700000000;

    fn secret() -> SigningSecret {
        SigningSecret::new("server-token-secret")
    }

    #[test]
    fn test_issue_and_verify() {
        let token = issue_signed_token(&secret(), "hub", "connector", Some("conn-1"), 600, NOW);
        let verified = verify_signed_token(&token, &secret(), "hub", "connector", NOW).unwrap();
        assert_eq!(verified.subject(), Some("conn-1"));
        assert_eq!(verified.role(), ROLE_CONNECTOR);
    }

    #[test]
    fn test_verify_without_subject() {
        let token = issue_signed_token(&secret(), "hub", "connector", None, 600, NOW);
        let verified = verify_signed_token(&token, &secret(), "hub", "connector", NOW).unwrap();
        assert_eq!(verified.subject(), None);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_signed_token(&secret(), "hub", "connector", None, 600, NOW);
        let other = SigningSecret::new("a different secret");
        let result = verify_signed_token(&token, &other, "hub", "connector", NOW);
        assert_eq!(result.unwrap_err(), BearerError::InvalidToken);
    }

    #[test]
    fn test_issuer_mismatch_rejected() {
        let token = issue_signed_token(&secret(), "hub", "connector", None, 600, NOW);
        let result = verify_signed_token(&token, &secret(), "other-hub", "connector", NOW);
        assert_eq!(result.unwrap_err(), BearerError::InvalidToken);
    }

    #[test]
    fn test_audience_mismatch_rejected() {
        let token = issue_signed_token(&secret(), "hub", "connector", None, 600, NOW);
        let result = verify_signed_token(&token, &secret(), "hub", "admin-ui", NOW);
        assert_eq!(result.unwrap_err(), BearerError::InvalidToken);
    }

    #[test]
    fn test_role_mismatch_is_forbidden_not_invalid() {
        let claims = AccessClaims {
            iss: "hub".to_string(),
            aud: "connector".to_string(),
            iat: NOW,
            exp: NOW + 600,
            role: "operator".to_string(),
            sub: None,
        };
        let token = encode_token(&secret(), &claims);
        let result = verify_signed_token(&token, &secret(), "hub", "connector", NOW);
        assert_eq!(result.unwrap_err(), BearerError::RoleMismatch);
    }

    #[test]
    fn test_expiry_boundary() {
        let token = issue_signed_token(&secret(), "hub", "connector", None, 600, NOW);
        // One second before expiry: valid.
        assert!(verify_signed_token(&token, &secret(), "hub", "connector", NOW + 599).is_ok());
        // At expiry: rejected.
        let result = verify_signed_token(&token, &secret(), "hub", "connector", NOW + 600);
        assert_eq!(result.unwrap_err(), BearerError::ExpiredToken);
    }

    #[test]
    fn test_payload_tamper_rejected() {
        let token = issue_signed_token(&secret(), "hub", "connector", Some("conn-1"), 600, NOW);
        let (payload_b64, mac_b64) = token.split_once('.').unwrap();

        // Re-encode a modified payload under the original MAC.
        let mut payload = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        let json = String::from_utf8(payload.clone()).unwrap();
        payload = json.replace("conn-1", "conn-2").into_bytes();
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(&payload), mac_b64);

        let result = verify_signed_token(&forged, &secret(), "hub", "connector", NOW);
        assert_eq!(result.unwrap_err(), BearerError::InvalidToken);
    }

    #[test]
    fn test_structurally_invalid_tokens_rejected() {
        for garbage in ["", "no-dot-here", "a.b.c.d", "!!.!!", "YWJj."] {
            let result = verify_signed_token(garbage, &secret(), "hub", "connector", NOW);
            assert_eq!(result.unwrap_err(), BearerError::InvalidToken, "input: {garbage:?}");
        }
    }

    #[test]
    fn test_request_signature_cannot_pass_as_token() {
        // A MAC computed without the token domain prefix (as the request
        // signer does) must not verify as a token MAC.
        let claims = AccessClaims {
            iss: "hub".to_string(),
            aud: "connector".to_string(),
            iat: NOW,
            exp: NOW + 600,
            role: ROLE_CONNECTOR.to_string(),
            sub: None,
        };
        let payload = serde_json::to_vec(&claims).unwrap();

        let mut mac = HmacSha256::new_from_slice(secret().expose()).unwrap();
        mac.update(&payload); // no DOMAIN_PREFIX
        let undomained = mac.finalize().into_bytes();

        let forged = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(undomained)
        );
        let result = verify_signed_token(&forged, &secret(), "hub", "connector", NOW);
        assert_eq!(result.unwrap_err(), BearerError::InvalidToken);
    }
}
