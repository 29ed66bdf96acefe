//! PayFast IPN (Instant Payment Notification) signature verification.
//!
//! The gateway posts a flat form payload to the merchant and signs it with an
//! MD5 digest of a canonical parameter string. This crate rebuilds that string
//! from the untrusted payload and checks the claimed `signature` field against
//! it in constant time. Nothing here performs I/O.
//!
//! # Pieces
//!
//! - [`Payload`] - validated, order-preserving field map built at the HTTP boundary
//! - [`CanonicalPolicy`] - key ordering, empty-value handling and value encoding
//! - [`canonicalize`] / [`verify`] - the protocol itself
//! - [`Verifier`] - immutable policy + secret bundle built once at startup
//!
//! # Example
//!
//! ```
//! use ipn::{CanonicalPolicy, Payload, Verifier};
//!
//! let payload = Payload::from_form(
//!     b"amount=100.00&item_name=Test+Item&signature=694ff863a4cc0ddbf5d83b6c9fa4b56d",
//! )
//! .unwrap();
//!
//! let verifier = Verifier::new(CanonicalPolicy::default(), None);
//! assert!(verifier.verify(&payload));
//! ```

pub mod canonical;
pub mod constants;
pub mod error;
pub mod mode;
pub mod payload;
pub mod policy;
pub mod signature;
pub mod verifier;

pub use canonical::canonicalize;
pub use constants::*;
pub use error::IpnError;
pub use mode::{Mode, Passphrases};
pub use payload::Payload;
pub use policy::{CanonicalPolicy, EmptyValues, KeyOrder, ValueEncoding};
pub use signature::{constant_time_eq, signature_of, verify};
pub use verifier::{Verification, Verifier};
