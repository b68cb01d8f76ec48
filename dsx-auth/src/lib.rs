//! Pure authentication library for DSX.
//!
//! This crate is intentionally IO-free:
//! - No filesystem operations
//! - No network calls
//! - No database interactions
//! - No logging
//!
//! Dependencies are injected via traits:
//! - [`authn::SecretResolver`] - Signing-secret lookup by key id
//! - [`authn::ReplayGuard`] - Nonce tracking for replay prevention
//!
//! Every verification entry point takes `now` (unix seconds) explicitly so
//! callers control the clock.
//!
//! # Example
//!
//! ```ignore
//! use dsx_auth::{authn, secret::SigningSecret};
//!
//! // Connector signs an outbound request
//! let secret = SigningSecret::new("...");
//! let header = authn::sign_request_now("kid", &secret, "POST", "/v1/scan", b"{}")?;
//!
//! // Hub verifies it
//! let verified = authn::verify_request("POST", "/v1/scan", b"{}", &header, &resolver, now, 60)?;
//! ```

pub mod authn;
pub mod canonical;
pub mod clock;
pub mod enrollment;
pub mod secret;
pub mod token;

pub use authn::{
    sign_request, sign_request_now, verify_envelope, verify_request, LruReplayGuard, ReplayGuard,
    SecretResolver, SignatureError, SignedRequestEnvelope, VerifiedHmac,
};
pub use canonical::canonical_message;
pub use enrollment::EnrollmentGate;
pub use secret::SigningSecret;
pub use token::{
    issue_signed_token, verify_signed_token, AccessClaims, BearerError, VerifiedBearer,
    ROLE_CONNECTOR,
};
