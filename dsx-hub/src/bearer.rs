//! Bearer token issuance and verification.
//!
//! Two token kinds prove the connector role:
//! - *opaque* tokens, random strings backed by a store entry with a TTL;
//!   revocable by deleting the entry before expiry;
//! - *signed* tokens (see [`dsx_auth::token`]), self-contained and
//!   verifiable without a store lookup.
//!
//! # Scheme precedence
//!
//! When an endpoint accepts both kinds, [`BearerTokens::verify_any`] tries
//! opaque resolution first (one store lookup) and falls back to the signed
//! scheme when the token does not resolve or the store is unreachable.
//! A caller cannot tell the kinds apart by shape, so this ordering is part
//! of the verifier's contract and must stay consistent.

use sha2::{Digest, Sha256};

use dsx_auth::secret::{random_urlsafe, SigningSecret};
use dsx_auth::token::{verify_signed_token, BearerError, VerifiedBearer, ROLE_CONNECTOR};

use crate::store::{
    opaque_token_key, CredentialStore, StoreError, FIELD_TOKEN_EXPIRY, FIELD_TOKEN_SUBJECT,
};

/// Opaque token entropy in bytes.
const OPAQUE_TOKEN_ENTROPY: usize = 32;

/// Extract the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// SHA-256 hex digest of a token, for log-safe references.
///
/// Raw tokens never appear in logs; the digest lets operators correlate
/// issuance and revocation events without learning the capability.
#[must_use]
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issues, verifies, and revokes bearer tokens against a credential store.
pub struct BearerTokens<S> {
    store: S,
}

impl<S: CredentialStore> BearerTokens<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Issue an opaque token.
    ///
    /// The store entry holds `{sub, exp}` and carries a physical TTL equal
    /// to the logical expiry, so the store evicts it at the same moment it
    /// would stop verifying.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if the entry cannot be written.
    pub fn issue_opaque(
        &self,
        subject: Option<&str>,
        ttl_seconds: u64,
        now: i64,
    ) -> Result<String, StoreError> {
        let token = random_urlsafe(OPAQUE_TOKEN_ENTROPY);
        let exp = now.saturating_add(ttl_seconds as i64).to_string();

        let mut fields: Vec<(&str, &str)> = vec![(FIELD_TOKEN_EXPIRY, exp.as_str())];
        if let Some(subject) = subject {
            fields.push((FIELD_TOKEN_SUBJECT, subject));
        }
        self.store
            .set_with_ttl(&opaque_token_key(&token), &fields, ttl_seconds)?;

        tracing::info!(
            token = %token_digest(&token),
            subject = subject.unwrap_or("-"),
            ttl_seconds,
            "opaque token issued"
        );
        Ok(token)
    }

    /// Verify an opaque token.
    ///
    /// Expiry is checked lazily here even though the store TTL should have
    /// evicted a dead entry; either outcome rejects the token.
    ///
    /// # Errors
    ///
    /// - [`BearerError::InvalidToken`] if no entry exists.
    /// - [`BearerError::ExpiredToken`] if the entry outlived its expiry.
    /// - [`BearerError::StoreUnavailable`] if the store cannot be reached.
    #[must_use = "verification result must be checked"]
    pub fn verify_opaque(&self, token: &str, now: i64) -> Result<VerifiedBearer, BearerError> {
        let fields = self
            .store
            .get_fields(
                &opaque_token_key(token),
                &[FIELD_TOKEN_SUBJECT, FIELD_TOKEN_EXPIRY],
            )
            .map_err(|_| BearerError::StoreUnavailable)?;

        let Some(exp) = fields.get(FIELD_TOKEN_EXPIRY).cloned().flatten() else {
            return Err(BearerError::InvalidToken);
        };
        let exp: i64 = exp.parse().map_err(|_| BearerError::InvalidToken)?;
        if now >= exp {
            return Err(BearerError::ExpiredToken);
        }

        let subject = fields.get(FIELD_TOKEN_SUBJECT).cloned().flatten();
        Ok(VerifiedBearer::new(subject, ROLE_CONNECTOR))
    }

    /// Revoke an opaque token before its natural expiry.
    ///
    /// Returns whether a live entry was removed. Signed tokens cannot be
    /// revoked; their expiry is the sole lifecycle control.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    pub fn revoke_opaque(&self, token: &str) -> Result<bool, StoreError> {
        let revoked = self.store.delete(&opaque_token_key(token))?;
        if revoked {
            tracing::info!(token = %token_digest(token), "opaque token revoked");
        }
        Ok(revoked)
    }

    /// Verify a token of either kind, opaque first.
    ///
    /// Falls back to the signed scheme when the opaque lookup misses or
    /// the store is unreachable. If both schemes fail and the store was
    /// unreachable, the store fault wins: an infrastructure outage must
    /// not masquerade as a definitive auth failure.
    ///
    /// # Errors
    ///
    /// See [`Self::verify_opaque`] and [`dsx_auth::token::verify_signed_token`].
    #[must_use = "verification result must be checked"]
    pub fn verify_any(
        &self,
        token: &str,
        secret: &SigningSecret,
        issuer: &str,
        audience: &str,
        now: i64,
    ) -> Result<VerifiedBearer, BearerError> {
        let opaque = match self.verify_opaque(token, now) {
            Ok(verified) => return Ok(verified),
            // The token resolved to a store entry; its fate is decided.
            Err(BearerError::ExpiredToken) => return Err(BearerError::ExpiredToken),
            Err(err) => err,
        };

        match verify_signed_token(token, secret, issuer, audience, now) {
            Ok(verified) => Ok(verified),
            Err(signed_err) => {
                if opaque == BearerError::StoreUnavailable {
                    Err(BearerError::StoreUnavailable)
                } else {
                    Err(signed_err)
                }
            }
        }
    }
}
