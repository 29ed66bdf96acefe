use std::fmt;

use crate::canonical::canonicalize;
use crate::payload::Payload;
use crate::policy::CanonicalPolicy;
use crate::signature::{constant_time_eq, digest_hex};

/// Outcome of checking one payload.
///
/// `Debug` prints only the length of `canonical`.
#[derive(Clone, PartialEq, Eq)]
pub struct Verification {
    pub authentic: bool,
    /// The string the signature was recomputed over.
    ///
    /// When a secret is configured this ends in `passphrase=<secret>` in
    /// cleartext. Never log it or send it anywhere.
    pub canonical: String,
}

impl fmt::Debug for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verification")
            .field("authentic", &self.authentic)
            .field("canonical_len", &self.canonical.len())
            .finish()
    }
}

/// Immutable verification settings, built once and shared by every request.
#[derive(Clone, Default)]
pub struct Verifier {
    policy: CanonicalPolicy,
    secret: Option<String>,
}

impl Verifier {
    /// An empty `secret` is treated as no secret.
    pub fn new(policy: CanonicalPolicy, secret: Option<String>) -> Self {
        Self {
            policy,
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn policy(&self) -> &CanonicalPolicy {
        &self.policy
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    pub fn canonicalize(&self, payload: &Payload) -> String {
        canonicalize(payload, self.secret.as_deref(), &self.policy)
    }

    /// The signature a sender sharing this configuration would attach.
    pub fn sign(&self, payload: &Payload) -> String {
        digest_hex(&self.canonicalize(payload))
    }

    pub fn check(&self, payload: &Payload) -> Verification {
        let canonical = self.canonicalize(payload);
        let authentic = match payload.signature() {
            Some(claimed) => constant_time_eq(&digest_hex(&canonical), claimed),
            None => false,
        };
        Verification {
            authentic,
            canonical,
        }
    }

    pub fn verify(&self, payload: &Payload) -> bool {
        self.check(payload).authentic
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("policy", &self.policy)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
