//! Request authentication choke point.
//!
//! Every protected request passes through the [`Authenticator`]; it is the
//! only place the enablement flag is consulted, so no component can
//! independently decide to skip a check.

use dsx_auth::authn::{
    verify_envelope, LruReplayGuard, ReplayGuard, SignatureError, SignedRequestEnvelope,
};
use dsx_auth::token::{BearerError, VerifiedBearer};
use dsx_auth::SigningSecret;

use crate::bearer::{bearer_token, BearerTokens};
use crate::config::AuthSettings;
use crate::store::{
    connector_key, key_index_key, CredentialStore, StoreError, FIELD_CONNECTOR_ID,
    FIELD_HMAC_SECRET,
};

/// Who a verified request turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RequestIdentity {
    /// A connector that proved possession of its signing secret.
    Connector {
        connector_id: String,
        key_id: String,
    },
    /// A bearer of a valid access token.
    Bearer(VerifiedBearer),
    /// Authentication is disabled process-wide; no identity was proven.
    AuthDisabled,
}

/// Verifies inbound credentials of every kind against one store and one
/// settings struct.
pub struct Authenticator<S> {
    settings: AuthSettings,
    store: S,
    replay: Box<dyn ReplayGuard>,
    gate: dsx_auth::EnrollmentGate,
}

impl<S: CredentialStore> Authenticator<S> {
    /// Build an authenticator with the default in-process replay guard
    /// (TTL = 2 x clock skew, capacity from settings).
    #[must_use]
    pub fn new(settings: AuthSettings, store: S) -> Self {
        let replay = Box::new(LruReplayGuard::new(
            settings.clock_skew_seconds.saturating_mul(2),
            settings.replay_cache_entries,
        ));
        Self::with_replay_guard(settings, store, replay)
    }

    /// Build an authenticator with a custom replay guard.
    #[must_use]
    pub fn with_replay_guard(
        settings: AuthSettings,
        store: S,
        replay: Box<dyn ReplayGuard>,
    ) -> Self {
        let gate = settings.enrollment_gate();
        Self {
            settings,
            store,
            replay,
            gate,
        }
    }

    /// Whether authentication is enabled for this process.
    #[must_use]
    pub fn auth_enabled(&self) -> bool {
        self.settings.auth_enabled
    }

    /// The settings this authenticator was built with.
    #[must_use]
    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Verify an HMAC-signed request.
    ///
    /// Resolves the key id through the reverse index, checks the skew
    /// window and signature, then consults the replay guard. With the
    /// policy switch off this always succeeds with
    /// [`RequestIdentity::AuthDisabled`].
    ///
    /// # Errors
    ///
    /// Any [`SignatureError`]; an absent header is `MalformedHeader`.
    pub fn authenticate_signed_request(
        &self,
        method: &str,
        path_q: &str,
        body: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<RequestIdentity, SignatureError> {
        if !self.settings.auth_enabled {
            return Ok(RequestIdentity::AuthDisabled);
        }

        let header = header.ok_or(SignatureError::MalformedHeader)?;
        let envelope = SignedRequestEnvelope::parse(header)?;

        let (connector_id, secret) = self
            .credential_for_key_id(&envelope.key_id)
            .map_err(|error| {
                tracing::warn!(key_id = %envelope.key_id, error = %error, "secret lookup failed");
                SignatureError::StoreUnavailable
            })?
            .ok_or(SignatureError::UnknownKeyId)?;

        verify_envelope(
            method,
            path_q,
            body,
            &envelope,
            &secret,
            now,
            self.settings.clock_skew_seconds,
        )?;

        // Replay is checked after the signature so invalid traffic cannot
        // pollute the nonce cache.
        if !self
            .replay
            .check_and_insert(&envelope.key_id, &envelope.nonce, now)
        {
            tracing::warn!(key_id = %envelope.key_id, "replayed nonce rejected");
            return Err(SignatureError::ReplayedNonce);
        }

        Ok(RequestIdentity::Connector {
            connector_id,
            key_id: envelope.key_id,
        })
    }

    /// Verify a bearer credential from an `Authorization` header value.
    ///
    /// Opaque tokens are tried first, then the signed scheme (see
    /// [`BearerTokens::verify_any`]). With the policy switch off this
    /// always succeeds with [`RequestIdentity::AuthDisabled`].
    ///
    /// # Errors
    ///
    /// [`BearerError::MissingCredential`] when no `Bearer` header is
    /// present; otherwise any [`BearerError`].
    pub fn authenticate_bearer(
        &self,
        header: Option<&str>,
        now: i64,
    ) -> Result<RequestIdentity, BearerError> {
        if !self.settings.auth_enabled {
            return Ok(RequestIdentity::AuthDisabled);
        }

        let token = header
            .and_then(bearer_token)
            .ok_or(BearerError::MissingCredential)?;

        let verified = BearerTokens::new(&self.store).verify_any(
            token,
            &self.settings.token_secret,
            &self.settings.token_issuer,
            &self.settings.token_audience,
            now,
        )?;
        Ok(RequestIdentity::Bearer(verified))
    }

    /// Check an enrollment token, as presented in the
    /// `X-Enrollment-Token` header (or as a bearer token on the
    /// enrollment-only endpoint). With the policy switch off every
    /// presentation is accepted.
    #[must_use]
    pub fn verify_enrollment(&self, presented: &str) -> bool {
        if !self.settings.auth_enabled {
            return true;
        }
        self.gate.verify_enrollment(presented)
    }

    /// Resolve key id -> (connector id, secret) via the reverse index.
    ///
    /// An index entry pointing at a missing credential record means the
    /// store is inconsistent (e.g. a half-completed deprovisioning); it is
    /// logged and treated as an unknown key id.
    fn credential_for_key_id(
        &self,
        key_id: &str,
    ) -> Result<Option<(String, SigningSecret)>, StoreError> {
        let index = self
            .store
            .get_fields(&key_index_key(key_id), &[FIELD_CONNECTOR_ID])?;
        let Some(connector_id) = index.get(FIELD_CONNECTOR_ID).cloned().flatten() else {
            return Ok(None);
        };

        let record = self
            .store
            .get_fields(&connector_key(&connector_id), &[FIELD_HMAC_SECRET])?;
        let Some(secret) = record.get(FIELD_HMAC_SECRET).cloned().flatten() else {
            tracing::warn!(
                key_id = %key_id,
                connector_id = %connector_id,
                "key index entry points at a missing credential record"
            );
            return Ok(None);
        };

        Ok(Some((connector_id, SigningSecret::new(secret))))
    }
}
