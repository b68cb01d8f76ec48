//! Connector credential provisioning.
//!
//! A connector's signing credential is minted once and never rotated
//! automatically; enrollment retries must be able to call
//! [`Provisioner::ensure_credential`] repeatedly and get the same pair
//! back.

use dsx_auth::secret::{random_urlsafe, SigningSecret};

use crate::store::{
    connector_key, key_index_key, CredentialStore, StoreError, FIELD_CONNECTOR_ID,
    FIELD_HMAC_KEY_ID, FIELD_HMAC_SECRET,
};

/// Key id entropy in bytes (base64url-encoded for the wire).
const KEY_ID_ENTROPY: usize = 12;

/// Secret entropy in bytes.
const SECRET_ENTROPY: usize = 32;

/// A connector's signing credential.
#[derive(Debug, Clone)]
pub struct ConnectorCredential {
    /// Opaque connector identifier (UUID-shaped by convention, not
    /// enforced).
    pub connector_id: String,
    /// Short random key id carried on signed requests.
    pub key_id: String,
    /// High-entropy signing secret.
    pub secret: SigningSecret,
}

/// Result of a provisioning call.
///
/// The reverse index write is best-effort: a credential whose index entry
/// is missing still signs outbound requests, but inbound requests carrying
/// its key id fail verification until the index is repaired. That state is
/// reported explicitly, never swallowed.
#[derive(Debug)]
pub enum ProvisionOutcome {
    /// Credential and reverse index are both in place.
    Ready(ConnectorCredential),
    /// Credential stored, reverse index write failed.
    IndexDegraded {
        credential: ConnectorCredential,
        error: StoreError,
    },
}

impl ProvisionOutcome {
    /// The provisioned credential, regardless of index state.
    #[must_use]
    pub fn credential(&self) -> &ConnectorCredential {
        match self {
            Self::Ready(credential) | Self::IndexDegraded { credential, .. } => credential,
        }
    }

    /// Consume the outcome, keeping the credential.
    #[must_use]
    pub fn into_credential(self) -> ConnectorCredential {
        match self {
            Self::Ready(credential) | Self::IndexDegraded { credential, .. } => credential,
        }
    }

    /// Whether the reverse index is out of sync with the credential.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::IndexDegraded { .. })
    }
}

/// Errors that abort provisioning entirely.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ProvisionError {
    /// The credential record itself could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Mints and retrieves connector credentials.
pub struct Provisioner<S> {
    store: S,
}

impl<S: CredentialStore> Provisioner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Idempotently create or retrieve the credential for a connector.
    ///
    /// An existing credential is returned unchanged. On that path the
    /// reverse index entry is checked and repaired if missing, so retrying
    /// after a crash between the credential and index writes converges to
    /// a fully indexed state.
    ///
    /// A partial record (one field present, the other missing) is treated
    /// as corrupt and overwritten with a fresh pair.
    ///
    /// # Errors
    ///
    /// [`ProvisionError::Store`] if the credential record itself cannot be
    /// read or written. Index write failures do NOT error; they surface as
    /// [`ProvisionOutcome::IndexDegraded`].
    pub fn ensure_credential(
        &self,
        connector_id: &str,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let record_key = connector_key(connector_id);
        let existing = self
            .store
            .get_fields(&record_key, &[FIELD_HMAC_KEY_ID, FIELD_HMAC_SECRET])?;

        let key_id = existing.get(FIELD_HMAC_KEY_ID).cloned().flatten();
        let secret = existing.get(FIELD_HMAC_SECRET).cloned().flatten();

        if let (Some(key_id), Some(secret)) = (key_id, secret) {
            let credential = ConnectorCredential {
                connector_id: connector_id.to_string(),
                key_id,
                secret: SigningSecret::new(secret),
            };
            return Ok(self.ensure_index(credential));
        }

        // Fresh credential from OS randomness.
        let key_id = random_urlsafe(KEY_ID_ENTROPY);
        let secret = SigningSecret::generate(SECRET_ENTROPY);

        self.store.set_fields(
            &record_key,
            &[
                (FIELD_HMAC_KEY_ID, &key_id),
                (FIELD_HMAC_SECRET, secret.expose_str()),
            ],
        )?;
        tracing::info!(connector_id = %connector_id, key_id = %key_id, "connector credential provisioned");

        let credential = ConnectorCredential {
            connector_id: connector_id.to_string(),
            key_id,
            secret,
        };
        Ok(self.write_index(credential))
    }

    /// Verify the reverse index entry exists, writing it if not.
    fn ensure_index(&self, credential: ConnectorCredential) -> ProvisionOutcome {
        let index_key = key_index_key(&credential.key_id);
        match self.store.get_fields(&index_key, &[FIELD_CONNECTOR_ID]) {
            Ok(fields) if fields.get(FIELD_CONNECTOR_ID).cloned().flatten().is_some() => {
                ProvisionOutcome::Ready(credential)
            }
            // Missing entry or unreadable index: attempt the (re)write.
            _ => self.write_index(credential),
        }
    }

    fn write_index(&self, credential: ConnectorCredential) -> ProvisionOutcome {
        let index_key = key_index_key(&credential.key_id);
        match self
            .store
            .set_fields(&index_key, &[(FIELD_CONNECTOR_ID, &credential.connector_id)])
        {
            Ok(()) => ProvisionOutcome::Ready(credential),
            Err(error) => {
                tracing::warn!(
                    connector_id = %credential.connector_id,
                    key_id = %credential.key_id,
                    error = %error,
                    "credential stored but reverse index write failed; inbound requests with this key id will be rejected until repaired"
                );
                ProvisionOutcome::IndexDegraded { credential, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashMap;

    /// Store wrapper that fails writes to the key-index namespace,
    /// simulating a crash window between the two provisioning writes.
    struct IndexWriteFails {
        inner: MemoryStore,
        fail_index_writes: std::sync::atomic::AtomicBool,
    }

    impl IndexWriteFails {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_index_writes: std::sync::atomic::AtomicBool::new(true),
            }
        }

        fn heal(&self) {
            self.fail_index_writes
                .store(false, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl CredentialStore for IndexWriteFails {
        fn get_fields(
            &self,
            key: &str,
            fields: &[&str],
        ) -> Result<HashMap<String, Option<String>>, StoreError> {
            self.inner.get_fields(key, fields)
        }

        fn set_fields(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
            if key.starts_with("hmackey:")
                && self.fail_index_writes.load(std::sync::atomic::Ordering::SeqCst)
            {
                return Err(StoreError::Unavailable("index shard down".to_string()));
            }
            self.inner.set_fields(key, fields)
        }

        fn set_with_ttl(
            &self,
            key: &str,
            fields: &[(&str, &str)],
            ttl_seconds: u64,
        ) -> Result<(), StoreError> {
            self.inner.set_with_ttl(key, fields, ttl_seconds)
        }

        fn ttl_remaining(&self, key: &str) -> Result<Option<u64>, StoreError> {
            self.inner.ttl_remaining(key)
        }

        fn delete(&self, key: &str) -> Result<bool, StoreError> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn test_fresh_credential_shape() {
        let provisioner = Provisioner::new(MemoryStore::new());
        let credential = provisioner
            .ensure_credential("conn-1")
            .unwrap()
            .into_credential();
        // 12 bytes -> 16 chars, 32 bytes -> 43 chars, base64url no pad
        assert_eq!(credential.key_id.len(), 16);
        assert_eq!(credential.secret.expose_str().len(), 43);
        assert_eq!(credential.connector_id, "conn-1");
    }

    #[test]
    fn test_idempotent_provisioning() {
        let provisioner = Provisioner::new(MemoryStore::new());
        let first = provisioner.ensure_credential("conn-1").unwrap().into_credential();
        let second = provisioner.ensure_credential("conn-1").unwrap().into_credential();
        assert_eq!(first.key_id, second.key_id);
        assert_eq!(first.secret, second.secret);
    }

    #[test]
    fn test_distinct_connectors_get_distinct_credentials() {
        let provisioner = Provisioner::new(MemoryStore::new());
        let a = provisioner.ensure_credential("conn-a").unwrap().into_credential();
        let b = provisioner.ensure_credential("conn-b").unwrap().into_credential();
        assert_ne!(a.key_id, b.key_id);
        assert_ne!(a.secret, b.secret);
    }

    #[test]
    fn test_index_entry_written() {
        let store = MemoryStore::new();
        let provisioner = Provisioner::new(store.clone());
        let credential = provisioner.ensure_credential("conn-1").unwrap().into_credential();

        let index = store
            .get_fields(&key_index_key(&credential.key_id), &[FIELD_CONNECTOR_ID])
            .unwrap();
        assert_eq!(
            index.get(FIELD_CONNECTOR_ID),
            Some(&Some("conn-1".to_string()))
        );
    }

    #[test]
    fn test_index_write_failure_reported_not_swallowed() {
        let store = IndexWriteFails::new();
        let provisioner = Provisioner::new(&store);
        let outcome = provisioner.ensure_credential("conn-1").unwrap();
        assert!(outcome.is_degraded());
        // The credential itself is usable for outbound signing.
        assert_eq!(outcome.credential().key_id.len(), 16);
    }

    #[test]
    fn test_retry_repairs_missing_index() {
        let store = IndexWriteFails::new();

        let degraded = Provisioner::new(&store).ensure_credential("conn-1").unwrap();
        assert!(degraded.is_degraded());
        let first = degraded.into_credential();

        // Store recovers; a retry returns the same credential and heals
        // the index.
        store.heal();
        let repaired = Provisioner::new(&store).ensure_credential("conn-1").unwrap();
        assert!(!repaired.is_degraded());
        let second = repaired.into_credential();
        assert_eq!(first.key_id, second.key_id);
        assert_eq!(first.secret, second.secret);

        let index = store
            .get_fields(&key_index_key(&second.key_id), &[FIELD_CONNECTOR_ID])
            .unwrap();
        assert_eq!(
            index.get(FIELD_CONNECTOR_ID),
            Some(&Some("conn-1".to_string()))
        );
    }

    #[test]
    fn test_partial_record_replaced() {
        let store = MemoryStore::new();
        store
            .set_fields(&connector_key("conn-1"), &[(FIELD_HMAC_KEY_ID, "orphan")])
            .unwrap();

        let provisioner = Provisioner::new(store.clone());
        let credential = provisioner.ensure_credential("conn-1").unwrap().into_credential();
        assert_ne!(credential.key_id, "orphan");
        assert_eq!(credential.secret.expose_str().len(), 43);
    }
}
