//! Enrollment token gate.

use subtle::ConstantTimeEq;

/// Gate over the configured enrollment tokens.
///
/// Accepts a primary token and an optional comma-separated allow-list
/// override. An empty configuration admits nothing.
///
/// # Security
///
/// All comparisons are constant-time, and every configured token is
/// compared on every call so match position does not leak through timing.
#[derive(Clone)]
pub struct EnrollmentGate {
    tokens: Vec<String>,
}

impl EnrollmentGate {
    /// Build a gate from the configured primary token and allow-list CSV.
    ///
    /// Empty and whitespace-only entries are dropped.
    #[must_use]
    pub fn new(primary: Option<&str>, allow_list_csv: Option<&str>) -> Self {
        let mut tokens = Vec::new();
        if let Some(primary) = primary {
            if !primary.trim().is_empty() {
                tokens.push(primary.trim().to_string());
            }
        }
        if let Some(csv) = allow_list_csv {
            for entry in csv.split(',') {
                let entry = entry.trim();
                if !entry.is_empty() {
                    tokens.push(entry.to_string());
                }
            }
        }
        Self { tokens }
    }

    /// Whether any enrollment token is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Check a presented token against the configured set.
    #[must_use]
    pub fn verify_enrollment(&self, presented: &str) -> bool {
        let mut matched = false;
        for token in &self.tokens {
            matched |= ct_eq(presented, token);
        }
        matched
    }
}

impl std::fmt::Debug for EnrollmentGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Token values never appear in debug output
        f.debug_struct("EnrollmentGate")
            .field("configured_tokens", &self.tokens.len())
            .finish()
    }
}

/// Constant-time string comparison.
fn ct_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}
