//! Bearer token error types.

/// Errors that can occur while verifying a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BearerError {
    /// No bearer credential was presented on a protected endpoint.
    /// Maps externally to "unauthenticated" with a challenge signal.
    #[error("missing bearer credential")]
    MissingCredential,

    /// The token does not resolve to anything: structurally invalid,
    /// wrong signature, wrong issuer/audience, or absent from the store.
    #[error("invalid token")]
    InvalidToken,

    /// The token resolved but its expiry has passed.
    #[error("token expired")]
    ExpiredToken,

    /// The token is structurally valid but carries the wrong role.
    /// The only variant that maps to "forbidden" rather than
    /// "unauthenticated".
    #[error("role not permitted")]
    RoleMismatch,

    /// The token store could not be consulted. A retryable infrastructure
    /// fault, never to be conflated with a definitive auth failure.
    #[error("token store unavailable")]
    StoreUnavailable,
}
