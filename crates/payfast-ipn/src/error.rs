use thiserror::Error;

/// Errors returned by IPN operations.
///
/// A signature mismatch is not an error: [`crate::verify`] reports it as `false`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IpnError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}
