//! First-contact enrollment.
//!
//! A brand-new connector has no credentials yet; it authorizes its first
//! provisioning call with a shared enrollment token distributed through an
//! out-of-band trusted channel. Tokens are static: no expiry, no
//! single-use marking, no per-connector binding.

mod gate;

pub use gate::EnrollmentGate;
