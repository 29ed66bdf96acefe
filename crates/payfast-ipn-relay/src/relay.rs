//! Forwarding of authentic notifications to the CRM.
//!
//! One POST per notification, no retries: the gateway re-sends notifications
//! that were not acknowledged with a 200, which covers transient CRM failures.

use std::time::Duration;

use hmac::{Hmac, Mac};
use ipn::Payload;
use reqwest::StatusCode;
use sha2::Sha256;

use crate::config::RelayConfig;
use crate::error::RelayError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the forwarded body.
pub const RELAY_SIGNATURE_HEADER: &str = "X-Relay-Signature";

/// HTTP client for relay calls. Redirects are not followed so a compromised
/// or misconfigured CRM cannot bounce payment data elsewhere.
pub fn relay_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

#[derive(Clone)]
pub struct CrmRelay {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    signing_key: Option<Vec<u8>>,
}

impl CrmRelay {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        token: Option<String>,
        signing_key: Option<Vec<u8>>,
    ) -> Self {
        Self {
            client,
            endpoint,
            token,
            signing_key,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        let client = relay_client(config.relay_timeout)
            .map_err(|e| RelayError::Internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::new(
            client,
            config.crm_endpoint.clone(),
            config.crm_token.clone(),
            config.relay_signing_secret.clone(),
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the payload to the CRM as a JSON object, fields in arrival order.
    ///
    /// Returns the CRM status on 2xx; any other status or a transport failure
    /// is a [`RelayError::Relay`].
    pub async fn forward(&self, payload: &Payload) -> Result<StatusCode, RelayError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| RelayError::Internal(format!("failed to serialize payload: {e}")))?;

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json");

        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        if let Some(ref key) = self.signing_key {
            req = req.header(RELAY_SIGNATURE_HEADER, sign_body(key, &body)?);
        }

        let resp = req.body(body).send().await?;
        let status = resp.status();

        if status.is_success() {
            tracing::debug!(endpoint = %self.endpoint, status = %status, "notification relayed");
            Ok(status)
        } else {
            Err(RelayError::Relay(format!(
                "CRM responded with status {}",
                status.as_u16()
            )))
        }
    }
}

impl std::fmt::Debug for CrmRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmRelay")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("signing_key", &self.signing_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Hex-encoded HMAC-SHA256 of `body`.
pub fn sign_body(key: &[u8], body: &[u8]) -> Result<String, RelayError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| RelayError::Internal(format!("invalid relay signing key: {e}")))?;
    mac.update(body);
    Ok(mac
        .finalize()
        .into_bytes()
        .iter()
        .fold(String::with_capacity(64), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
            s
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_matches_rfc4231_case_2() {
        let sig = sign_body(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn debug_hides_credentials() {
        let relay = CrmRelay::new(
            reqwest::Client::new(),
            "https://crm.example.com".into(),
            Some("bearer-value".into()),
            Some(b"key-value".to_vec()),
        );
        let rendered = format!("{relay:?}");
        assert!(!rendered.contains("bearer-value"));
        assert!(!rendered.contains("key-value"));
    }

    #[actix_rt::test]
    async fn unreachable_crm_is_relay_error() {
        let relay = CrmRelay::new(
            relay_client(Duration::from_secs(2)).unwrap(),
            "http://127.0.0.1:1/ipn".into(),
            None,
            None,
        );
        let payload = Payload::from_pairs([("a", "1")]).unwrap();
        let err = relay.forward(&payload).await.unwrap_err();
        assert!(matches!(err, RelayError::Relay(_)));
    }
}
