//! Access tokens.
//!
//! Two interchangeable kinds prove the connector role:
//! - the *signed* variant here, self-contained and verified without any
//!   store lookup;
//! - the *opaque* variant, a random string backed by a store entry, issued
//!   and verified by the hub crate (it needs the store adapter).

mod claims;
mod error;
mod signed;

pub use claims::{AccessClaims, ROLE_CONNECTOR};
pub use error::BearerError;
pub use signed::{encode_token, issue_signed_token, verify_signed_token, VerifiedBearer};
