//! Configuration surface.
//!
//! Settings are constructed once at process start (deserialized from the
//! host application's configuration) and passed by reference into the
//! authenticator. There is no global lookup and no lazy initialization.

use serde::Deserialize;

use dsx_auth::{EnrollmentGate, SigningSecret};

/// Default allowed clock skew for signed requests, seconds.
pub const DEFAULT_CLOCK_SKEW_SECONDS: i64 = 60;

/// Default TTL for opaque tokens, seconds.
pub const DEFAULT_OPAQUE_TOKEN_TTL_SECONDS: u64 = 600;

/// Default TTL for signed tokens, seconds.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;

/// Default replay guard capacity.
pub const DEFAULT_REPLAY_CACHE_ENTRIES: usize = 100_000;

/// Everything the trust subsystem consumes from configuration.
#[derive(Clone, Deserialize)]
pub struct AuthSettings {
    /// Process-wide enablement flag. When false every verifier is
    /// bypassed. Only for disabled-auth deployment modes, never a
    /// production default.
    #[serde(default = "default_true")]
    pub auth_enabled: bool,

    /// Primary enrollment token.
    #[serde(default)]
    pub enrollment_token: Option<String>,

    /// Comma-separated enrollment token allow-list override.
    #[serde(default)]
    pub enrollment_token_allow_list: Option<String>,

    /// Server-wide secret for signed tokens. Its provisioning is the host
    /// deployment's responsibility.
    pub token_secret: SigningSecret,

    /// Issuer claim stamped into and required of signed tokens.
    #[serde(default = "default_issuer")]
    pub token_issuer: String,

    /// Audience claim stamped into and required of signed tokens.
    #[serde(default = "default_audience")]
    pub token_audience: String,

    /// Signed token lifetime, seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: i64,

    /// Allowed clock skew for signed requests, seconds, both directions.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_seconds: i64,

    /// Opaque token lifetime, seconds.
    #[serde(default = "default_opaque_ttl")]
    pub opaque_token_ttl_seconds: u64,

    /// Replay guard capacity (tracked nonces).
    #[serde(default = "default_replay_entries")]
    pub replay_cache_entries: usize,
}

impl AuthSettings {
    /// Settings with all defaults and the given token secret.
    #[must_use]
    pub fn new(token_secret: SigningSecret) -> Self {
        Self {
            auth_enabled: true,
            enrollment_token: None,
            enrollment_token_allow_list: None,
            token_secret,
            token_issuer: default_issuer(),
            token_audience: default_audience(),
            token_ttl_seconds: default_token_ttl(),
            clock_skew_seconds: default_clock_skew(),
            opaque_token_ttl_seconds: default_opaque_ttl(),
            replay_cache_entries: default_replay_entries(),
        }
    }

    /// Build the enrollment gate from the configured tokens.
    #[must_use]
    pub fn enrollment_gate(&self) -> EnrollmentGate {
        EnrollmentGate::new(
            self.enrollment_token.as_deref(),
            self.enrollment_token_allow_list.as_deref(),
        )
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Enrollment tokens are shared secrets; only their presence is shown
        f.debug_struct("AuthSettings")
            .field("auth_enabled", &self.auth_enabled)
            .field("enrollment_token", &self.enrollment_token.as_ref().map(|_| "[redacted]"))
            .field(
                "enrollment_token_allow_list",
                &self.enrollment_token_allow_list.as_ref().map(|_| "[redacted]"),
            )
            .field("token_secret", &self.token_secret)
            .field("token_issuer", &self.token_issuer)
            .field("token_audience", &self.token_audience)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .field("opaque_token_ttl_seconds", &self.opaque_token_ttl_seconds)
            .field("replay_cache_entries", &self.replay_cache_entries)
            .finish()
    }
}

fn default_true() -> bool {
    true
}

fn default_issuer() -> String {
    "dsx-hub".to_string()
}

fn default_audience() -> String {
    "dsx-connector".to_string()
}

fn default_token_ttl() -> i64 {
    DEFAULT_TOKEN_TTL_SECONDS
}

fn default_clock_skew() -> i64 {
    DEFAULT_CLOCK_SKEW_SECONDS
}

fn default_opaque_ttl() -> u64 {
    DEFAULT_OPAQUE_TOKEN_TTL_SECONDS
}

fn default_replay_entries() -> usize {
    DEFAULT_REPLAY_CACHE_ENTRIES
}
