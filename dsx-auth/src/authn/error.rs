//! Request-signature error types.

/// Errors that can occur while verifying a signed request.
///
/// None of the variants carry secrets, tokens, or signature material; every
/// `Display` string is safe to surface to callers and logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SignatureError {
    /// The authorization header is missing, has the wrong scheme, or is
    /// missing a required field.
    #[error("malformed authorization header")]
    MalformedHeader,

    /// The header parsed but carries no key id.
    #[error("missing key id")]
    MissingKeyId,

    /// No signing secret is known for the presented key id.
    #[error("unknown key id")]
    UnknownKeyId,

    /// The request timestamp is outside the allowed skew window, in either
    /// direction.
    #[error("request timestamp outside allowed clock skew")]
    StaleRequest,

    /// The recomputed signature does not match the presented one.
    #[error("signature mismatch")]
    BadSignature,

    /// The nonce was already seen within the replay window.
    #[error("nonce already used")]
    ReplayedNonce,

    /// The secret lookup failed because the backing store was unreachable.
    /// This is a retryable infrastructure fault, not an auth decision.
    #[error("credential store unavailable")]
    StoreUnavailable,
}
