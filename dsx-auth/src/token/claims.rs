//! Access token claims.

use serde::{Deserialize, Serialize};

/// The single role this subsystem authorizes.
pub const ROLE_CONNECTOR: &str = "connector";

/// Claims carried by the signed token variant.
///
/// # Note on Public Fields
///
/// Fields are intentionally public for serialization. This is a data
/// transfer object - constructing claims does NOT make a valid token;
/// validity is decided by [`super::verify_signed_token`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Issuer identifier.
    pub iss: String,
    /// Intended audience.
    pub aud: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds. The sole lifecycle control for this variant.
    pub exp: i64,
    /// Granted role.
    pub role: String,
    /// Optional subject (connector id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}
