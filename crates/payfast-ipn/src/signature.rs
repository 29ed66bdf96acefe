//! MD5 signatures over the canonical string.
//!
//! MD5 is what the gateway mandates, so it stays for wire compatibility. The
//! comparison against the claimed signature is constant-time regardless.

use md5::{Digest, Md5};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::canonical::canonicalize;
use crate::constants::SIGNATURE_HEX_LEN;
use crate::payload::Payload;
use crate::policy::CanonicalPolicy;

/// Lowercase hex MD5 of the canonical string for `payload`.
pub fn signature_of(payload: &Payload, secret: Option<&str>, policy: &CanonicalPolicy) -> String {
    digest_hex(&canonicalize(payload, secret, policy))
}

/// Whether the payload's own `signature` field matches the recomputed one.
///
/// A missing signature is a plain `false`, never an error. The match is
/// exact: an uppercase-hex signature does not match.
pub fn verify(payload: &Payload, secret: Option<&str>, policy: &CanonicalPolicy) -> bool {
    let Some(claimed) = payload.signature() else {
        tracing::debug!("IPN payload carries no signature");
        return false;
    };
    constant_time_eq(&signature_of(payload, secret, policy), claimed)
}

pub(crate) fn digest_hex(canonical: &str) -> String {
    let digest = Md5::digest(canonical.as_bytes());
    digest.iter().fold(String::with_capacity(SIGNATURE_HEX_LEN), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Constant-time string comparison.
///
/// Both sides are hashed to fixed-length SHA-256 digests first so neither the
/// content nor the length of either input leaks through timing.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let ha = Sha256::digest(a.as_bytes());
    let hb = Sha256::digest(b.as_bytes());
    ha.ct_eq(&hb).into()
}
