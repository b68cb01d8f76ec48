//! Secret material handling.
//!
//! Signing secrets are high-entropy strings shared between a connector and
//! the hub. They are wrapped so that:
//! - Material is zeroized on drop
//! - No `Debug`/`Display` implementation leaks the value
//! - Equality comparison is constant-time

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A shared signing secret (HMAC key material).
///
/// # Security
///
/// The wrapped string is zeroized when the value is dropped. Access to the
/// raw material requires an explicit [`SigningSecret::expose`] call so that
/// uses are easy to audit.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SigningSecret(String);

impl SigningSecret {
    /// Wrap existing secret material.
    #[must_use]
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    /// Generate a fresh secret from `entropy_bytes` of OS randomness,
    /// encoded as unpadded URL-safe base64.
    #[must_use]
    pub fn generate(entropy_bytes: usize) -> Self {
        Self(random_urlsafe(entropy_bytes))
    }

    /// Raw key bytes for MAC computation.
    ///
    /// # Security
    ///
    /// The returned reference should not be stored. Copying the bytes
    /// defeats the purpose of automatic zeroization.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The secret as a string, for persistence to the credential store.
    #[must_use]
    pub fn expose_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for SigningSecret {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time comparison to prevent timing attacks
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for SigningSecret {}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningSecret([redacted; {} bytes])", self.0.len())
    }
}

impl From<&str> for SigningSecret {
    fn from(material: &str) -> Self {
        Self::new(material)
    }
}

/// `len` bytes of OS randomness, encoded as unpadded URL-safe base64.
///
/// Used for key ids, secrets, and opaque tokens.
#[must_use]
pub fn random_urlsafe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    let encoded = URL_SAFE_NO_PAD.encode(&bytes);
    bytes.zeroize();
    encoded
}
