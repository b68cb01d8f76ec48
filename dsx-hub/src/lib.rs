//! Hub-side credential plumbing for DSX.
//!
//! The pure verification logic lives in [`dsx_auth`]; this crate wires it
//! to a durable key-value store and the process configuration:
//!
//! - [`store`]: the store adapter trait and an in-memory implementation
//! - [`provision`]: idempotent minting of connector signing credentials
//! - [`bearer`]: opaque token issuance/revocation and dual-scheme
//!   verification
//! - [`authenticator`]: the single choke point every protected request
//!   goes through, including the process-wide enablement switch
//! - [`config`]: the settings struct, built once at startup
//! - [`rejection`]: mapping failures to 401/403 plus a machine-readable
//!   reason

pub mod authenticator;
pub mod bearer;
pub mod config;
pub mod provision;
pub mod rejection;
pub mod store;

pub use authenticator::{Authenticator, RequestIdentity};
pub use bearer::{bearer_token, token_digest, BearerTokens};
pub use config::AuthSettings;
pub use provision::{ConnectorCredential, ProvisionError, ProvisionOutcome, Provisioner};
pub use rejection::{AuthRejection, StatusClass};
pub use store::{CredentialStore, MemoryStore, StoreError};
