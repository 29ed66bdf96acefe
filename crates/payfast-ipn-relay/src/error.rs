use actix_web::{HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum RelayError {
    /// Body could not be turned into a payload
    Malformed(String),
    /// Recomputed signature did not match the claimed one
    InvalidSignature,
    /// Notification came from an address outside the allowlist
    ForbiddenSource(String),
    /// CRM unreachable or answered with a non-success status
    Relay(String),
    /// Internal error
    Internal(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Malformed(msg) => write!(f, "malformed payload: {}", msg),
            RelayError::InvalidSignature => write!(f, "invalid signature"),
            RelayError::ForbiddenSource(ip) => write!(f, "notification from disallowed source: {}", ip),
            RelayError::Relay(msg) => write!(f, "relay failed: {}", msg),
            RelayError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<ipn::IpnError> for RelayError {
    fn from(e: ipn::IpnError) -> Self {
        match e {
            ipn::IpnError::MalformedPayload(msg) => RelayError::Malformed(msg),
            other => RelayError::Internal(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Relay(e.to_string())
    }
}

impl ResponseError for RelayError {
    fn error_response(&self) -> HttpResponse {
        match self {
            RelayError::Malformed(msg) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "malformed_payload",
                "message": msg
            })),
            RelayError::InvalidSignature => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "invalid_signature",
                "message": "Notification signature could not be verified"
            })),
            RelayError::ForbiddenSource(_) => HttpResponse::Forbidden().json(serde_json::json!({
                "error": "forbidden_source",
                "message": "Notifications are not accepted from this address"
            })),
            RelayError::Relay(msg) => {
                tracing::error!("Relay error: {}", msg);
                HttpResponse::BadGateway().json(serde_json::json!({
                    "error": "relay_failed",
                    "message": "Failed to deliver notification downstream"
                }))
            }
            RelayError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(RelayError::Malformed("x".into()).error_response().status(), 400);
        assert_eq!(RelayError::InvalidSignature.error_response().status(), 400);
        assert_eq!(
            RelayError::ForbiddenSource("10.0.0.1".into()).error_response().status(),
            403
        );
        assert_eq!(RelayError::Relay("down".into()).error_response().status(), 502);
        assert_eq!(RelayError::Internal("bug".into()).error_response().status(), 500);
    }

    #[test]
    fn malformed_payload_maps_to_malformed() {
        let err: RelayError = ipn::IpnError::MalformedPayload("field 'a'".into()).into();
        assert!(matches!(err, RelayError::Malformed(ref m) if m == "field 'a'"));
    }
}
