//! Per-request signing and verification.

mod envelope;
mod error;
mod replay;
mod sign;
mod verify;

pub use envelope::{SignedRequestEnvelope, SCHEME};
pub use error::SignatureError;
pub use replay::{LruReplayGuard, ReplayGuard};
pub use sign::{random_nonce, sign_request, sign_request_now};
pub use verify::{
    verify_envelope, verify_request, ResolverUnavailable, SecretResolver, VerifiedHmac,
};
