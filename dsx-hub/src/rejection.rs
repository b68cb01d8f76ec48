//! Mapping auth failures to transport-level rejections.
//!
//! Every failure in this subsystem is terminal for the current request.
//! The HTTP layer needs only two things from a failure: which status class
//! to answer with and a machine-readable reason string. Raw secrets,
//! tokens, and signatures never appear here.

use dsx_auth::authn::SignatureError;
use dsx_auth::token::BearerError;

/// Status class of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// The caller did not prove an identity (HTTP 401).
    Unauthenticated,
    /// The caller proved an identity that is not allowed (HTTP 403).
    Forbidden,
}

impl StatusClass {
    /// The HTTP status code for this class.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Forbidden => 403,
        }
    }
}

/// A rejection ready to hand to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRejection {
    /// Which status class to answer with.
    pub status: StatusClass,
    /// Machine-readable reason, stable across releases.
    pub reason: &'static str,
    /// Challenge to advertise in `WWW-Authenticate`, when one applies.
    pub challenge: Option<&'static str>,
}

impl From<&SignatureError> for AuthRejection {
    fn from(error: &SignatureError) -> Self {
        let reason = match error {
            SignatureError::MalformedHeader => "malformed_header",
            SignatureError::MissingKeyId => "missing_key_id",
            SignatureError::UnknownKeyId => "unknown_key_id",
            SignatureError::StaleRequest => "stale_request",
            SignatureError::BadSignature => "bad_signature",
            SignatureError::ReplayedNonce => "replayed_nonce",
            SignatureError::StoreUnavailable => "store_unavailable",
            _ => "unauthenticated",
        };
        Self {
            status: StatusClass::Unauthenticated,
            reason,
            challenge: None,
        }
    }
}

impl From<&BearerError> for AuthRejection {
    fn from(error: &BearerError) -> Self {
        match error {
            BearerError::MissingCredential => Self {
                status: StatusClass::Unauthenticated,
                reason: "missing_credential",
                challenge: Some("Bearer"),
            },
            BearerError::InvalidToken => Self {
                status: StatusClass::Unauthenticated,
                reason: "invalid_token",
                challenge: None,
            },
            BearerError::ExpiredToken => Self {
                status: StatusClass::Unauthenticated,
                reason: "expired_token",
                challenge: None,
            },
            BearerError::RoleMismatch => Self {
                status: StatusClass::Forbidden,
                reason: "role_mismatch",
                challenge: None,
            },
            BearerError::StoreUnavailable => Self {
                status: StatusClass::Unauthenticated,
                reason: "store_unavailable",
                challenge: None,
            },
            _ => Self {
                status: StatusClass::Unauthenticated,
                reason: "unauthenticated",
                challenge: None,
            },
        }
    }
}
