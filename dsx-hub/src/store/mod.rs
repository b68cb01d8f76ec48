//! Credential store adapter.
//!
//! The subsystem requires a durable key-value store with per-key TTL; what
//! actually backs it (Redis, SQLite, a test double) is wired in behind the
//! [`CredentialStore`] trait. The adapter guarantees per-key atomicity for
//! single-key read/write but no cross-key transactions - the provisioner
//! is written to tolerate a crash between two related writes.

mod memory;

pub use memory::MemoryStore;

use std::collections::HashMap;
use std::sync::Arc;

/// Field holding a connector's HMAC key id.
pub const FIELD_HMAC_KEY_ID: &str = "hmac_key_id";
/// Field holding a connector's HMAC secret.
pub const FIELD_HMAC_SECRET: &str = "hmac_secret";
/// Field holding the connector id in a key-index entry.
pub const FIELD_CONNECTOR_ID: &str = "connector_id";
/// Field holding an opaque token's subject.
pub const FIELD_TOKEN_SUBJECT: &str = "sub";
/// Field holding an opaque token's expiry (unix seconds).
pub const FIELD_TOKEN_EXPIRY: &str = "exp";

/// Store key for a connector's credential record.
#[must_use]
pub fn connector_key(connector_id: &str) -> String {
    format!("connector:{connector_id}")
}

/// Store key for the reverse index entry of a signing key id.
#[must_use]
pub fn key_index_key(key_id: &str) -> String {
    format!("hmackey:{key_id}")
}

/// Store key for an opaque access token.
#[must_use]
pub fn opaque_token_key(token: &str) -> String {
    format!("token:{token}")
}

/// Errors from the store adapter.
///
/// An unreachable store is a retryable infrastructure fault; it is never
/// conflated with "key absent", which is a definitive answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The backing store could not be reached or returned an I/O error.
    /// The detail string must not contain secrets or tokens.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Interface to the external durable key-value store.
///
/// Keys are namespaced strings; values are field maps. Implementations
/// must provide per-key atomicity for each operation and be safely
/// callable from many in-flight requests.
pub trait CredentialStore: Send + Sync {
    /// Read the named fields of a key.
    ///
    /// Absent keys and absent fields both surface as `None` values; only
    /// an unreachable store is an error.
    fn get_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> Result<HashMap<String, Option<String>>, StoreError>;

    /// Upsert fields on a key. Does not implicitly expire the key; an
    /// existing TTL is left untouched.
    fn set_fields(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError>;

    /// Upsert fields and (re)set the key's TTL.
    fn set_with_ttl(
        &self,
        key: &str,
        fields: &[(&str, &str)],
        ttl_seconds: u64,
    ) -> Result<(), StoreError>;

    /// Remaining TTL in seconds, or `None` if the key is absent or has no
    /// expiry. Used to compute TTL on renewal.
    fn ttl_remaining(&self, key: &str) -> Result<Option<u64>, StoreError>;

    /// Delete a key. Returns whether it existed.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

impl<T: CredentialStore + ?Sized> CredentialStore for &T {
    fn get_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> Result<HashMap<String, Option<String>>, StoreError> {
        (**self).get_fields(key, fields)
    }

    fn set_fields(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
        (**self).set_fields(key, fields)
    }

    fn set_with_ttl(
        &self,
        key: &str,
        fields: &[(&str, &str)],
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        (**self).set_with_ttl(key, fields, ttl_seconds)
    }

    fn ttl_remaining(&self, key: &str) -> Result<Option<u64>, StoreError> {
        (**self).ttl_remaining(key)
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key)
    }
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn get_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> Result<HashMap<String, Option<String>>, StoreError> {
        (**self).get_fields(key, fields)
    }

    fn set_fields(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
        (**self).set_fields(key, fields)
    }

    fn set_with_ttl(
        &self,
        key: &str,
        fields: &[(&str, &str)],
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        (**self).set_with_ttl(key, fields, ttl_seconds)
    }

    fn ttl_remaining(&self, key: &str) -> Result<Option<u64>, StoreError> {
        (**self).ttl_remaining(key)
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key)
    }
}
