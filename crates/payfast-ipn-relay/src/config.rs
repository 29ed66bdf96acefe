use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use ipn::{CanonicalPolicy, EmptyValues, KeyOrder, Mode, Passphrases, ValueEncoding, Verifier};
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RATE_LIMIT_RPM: u32 = 120;
const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EVENT_LOG: &str = "webhook.log";

/// Relay service configuration, read once at startup.
#[derive(Clone)]
pub struct RelayConfig {
    /// Server port
    pub port: u16,
    /// Gateway environment; selects the passphrase
    pub mode: Mode,
    pub passphrases: Passphrases,
    /// Canonicalization policy shared with the sender
    pub policy: CanonicalPolicy,
    /// CRM endpoint that receives authentic notifications
    pub crm_endpoint: String,
    /// Bearer token for the CRM endpoint
    pub crm_token: Option<String>,
    pub relay_timeout: Duration,
    /// Key for the `X-Relay-Signature` HMAC on forwarded bodies (None = unsigned)
    pub relay_signing_secret: Option<Vec<u8>>,
    /// Source IPs allowed to post notifications (empty = any)
    pub allowed_sources: Vec<IpAddr>,
    /// Take the client IP from `X-Forwarded-For` (only behind a trusted proxy)
    pub trust_forwarded_for: bool,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u32,
    /// Bearer token required for /metrics endpoint (None = public)
    pub metrics_token: Option<String>,
    /// Append-only event log file (None = disabled)
    pub event_log_path: Option<PathBuf>,
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("port", &self.port)
            .field("mode", &self.mode)
            .field("passphrases", &self.passphrases)
            .field("policy", &self.policy)
            .field("crm_endpoint", &self.crm_endpoint)
            .field("crm_token", &self.crm_token.as_ref().map(|_| "[REDACTED]"))
            .field("relay_timeout", &self.relay_timeout)
            .field(
                "relay_signing_secret",
                &self.relay_signing_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("allowed_sources", &self.allowed_sources)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("event_log_path", &self.event_log_path)
            .finish()
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| var(name).filter(|s| !s.trim().is_empty());

        // Required: CRM endpoint
        let crm_endpoint =
            set("CRM_ENDPOINT_URL").ok_or(ConfigError::MissingRequired("CRM_ENDPOINT_URL"))?;
        let allow_http = set("RELAY_ALLOW_HTTP")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        validate_crm_endpoint(&crm_endpoint, allow_http)?;

        let port = set("PORT")
            .map(|s| parse_var("PORT", &s))
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let mode: Mode = set("IPN_MODE")
            .map(|s| parse_var("IPN_MODE", &s))
            .transpose()?
            .unwrap_or_default();

        let passphrases = Passphrases::new(
            set("PAYFAST_PASSPHRASE_SANDBOX"),
            set("PAYFAST_PASSPHRASE_PRODUCTION"),
        );

        let key_order: KeyOrder = set("IPN_KEY_ORDER")
            .map(|s| parse_var("IPN_KEY_ORDER", &s))
            .transpose()?
            .unwrap_or_default();
        let empty_values: EmptyValues = set("IPN_EMPTY_VALUES")
            .map(|s| parse_var("IPN_EMPTY_VALUES", &s))
            .transpose()?
            .unwrap_or_default();
        let value_encoding: ValueEncoding = set("IPN_VALUE_ENCODING")
            .map(|s| parse_var("IPN_VALUE_ENCODING", &s))
            .transpose()?
            .unwrap_or_default();
        let policy = CanonicalPolicy::new(key_order, empty_values, value_encoding);

        // SF_TOKEN is the name older deployments used
        let crm_token = set("CRM_TOKEN").or_else(|| set("SF_TOKEN"));

        let relay_timeout = Duration::from_secs(
            set("RELAY_TIMEOUT_SECS")
                .map(|s| parse_var("RELAY_TIMEOUT_SECS", &s))
                .transpose()?
                .unwrap_or(DEFAULT_RELAY_TIMEOUT_SECS),
        );

        let relay_signing_secret = set("RELAY_SIGNING_SECRET").map(|s| s.into_bytes());

        let allowed_sources = set("IPN_ALLOWED_SOURCES")
            .map(|list| parse_sources(&list))
            .transpose()?
            .unwrap_or_default();

        let trust_forwarded_for = set("TRUST_FORWARDED_FOR")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let rate_limit_rpm = set("RATE_LIMIT_RPM")
            .map(|s| parse_var("RATE_LIMIT_RPM", &s))
            .transpose()?
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        let metrics_token = set("METRICS_TOKEN");

        // An explicitly empty IPN_EVENT_LOG disables the file log.
        let event_log_path = match var("IPN_EVENT_LOG") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_EVENT_LOG)),
        };

        if passphrases.for_mode(mode).is_none() {
            tracing::warn!(
                "No passphrase configured for {mode} mode - signatures are checked without one"
            );
        }
        if crm_token.is_none() {
            tracing::warn!("CRM_TOKEN not set - relayed notifications carry no Authorization header");
        }
        if allow_http && !crm_endpoint.starts_with("https://") {
            tracing::warn!(
                "RELAY_ALLOW_HTTP=true - notifications will be relayed in cleartext. \
                 DO NOT use this in production!"
            );
        }
        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set - /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            port,
            mode,
            passphrases,
            policy,
            crm_endpoint,
            crm_token,
            relay_timeout,
            relay_signing_secret,
            allowed_sources,
            trust_forwarded_for,
            rate_limit_rpm,
            metrics_token,
            event_log_path,
        })
    }

    /// The verifier for the active mode's passphrase and policy.
    pub fn verifier(&self) -> Verifier {
        Verifier::new(
            self.policy,
            self.passphrases.for_mode(self.mode).map(str::to_string),
        )
    }
}

/// The CRM endpoint must be an absolute HTTPS URL with a host.
/// Plain HTTP is accepted only when explicitly allowed.
pub fn validate_crm_endpoint(endpoint: &str, allow_http: bool) -> Result<(), ConfigError> {
    let parsed = Url::parse(endpoint).map_err(|e| ConfigError::InvalidUrl(format!("{endpoint}: {e}")))?;

    match parsed.scheme() {
        "https" => {}
        "http" if allow_http => {}
        other => {
            return Err(ConfigError::InvalidUrl(format!(
                "{endpoint}: scheme '{other}' not allowed, CRM endpoint must use HTTPS"
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!("{endpoint}: missing host")));
    }

    Ok(())
}

fn parse_var<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name,
        reason: e.to_string(),
    })
}

fn parse_sources(list: &str) -> Result<Vec<IpAddr>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_var("IPN_ALLOWED_SOURCES", s))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<RelayConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RelayConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_with_only_endpoint() {
        let config = config_from(&[("CRM_ENDPOINT_URL", "https://crm.example.com/ipn")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.mode, Mode::Sandbox);
        assert_eq!(config.policy, CanonicalPolicy::default());
        assert_eq!(config.relay_timeout, Duration::from_secs(10));
        assert_eq!(config.event_log_path, Some(PathBuf::from("webhook.log")));
        assert!(config.allowed_sources.is_empty());
        assert!(!config.verifier().has_secret());
    }

    #[test]
    fn endpoint_is_required() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired("CRM_ENDPOINT_URL")));
    }

    #[test]
    fn http_endpoint_needs_explicit_opt_in() {
        let err = config_from(&[("CRM_ENDPOINT_URL", "http://crm.example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));

        let config = config_from(&[
            ("CRM_ENDPOINT_URL", "http://crm.example.com"),
            ("RELAY_ALLOW_HTTP", "true"),
        ])
        .unwrap();
        assert_eq!(config.crm_endpoint, "http://crm.example.com");
    }

    #[test]
    fn policy_and_mode_are_parsed() {
        let config = config_from(&[
            ("CRM_ENDPOINT_URL", "https://crm.example.com"),
            ("IPN_MODE", "production"),
            ("IPN_KEY_ORDER", "arrival"),
            ("IPN_EMPTY_VALUES", "include"),
            ("IPN_VALUE_ENCODING", "percent"),
            ("PAYFAST_PASSPHRASE_SANDBOX", "sand"),
            ("PAYFAST_PASSPHRASE_PRODUCTION", "prod"),
        ])
        .unwrap();
        assert_eq!(config.mode, Mode::Production);
        assert_eq!(config.policy.key_order, KeyOrder::Arrival);
        assert_eq!(config.policy.empty_values, EmptyValues::Include);
        assert_eq!(config.policy.value_encoding, ValueEncoding::PercentEncoded);
        assert_eq!(config.passphrases.for_mode(config.mode), Some("prod"));
        assert!(config.verifier().has_secret());
    }

    #[test]
    fn unknown_policy_name_is_rejected() {
        let err = config_from(&[
            ("CRM_ENDPOINT_URL", "https://crm.example.com"),
            ("IPN_VALUE_ENCODING", "base64"),
        ])
        .unwrap_err();
        match err {
            ConfigError::InvalidValue { name, .. } => assert_eq!(name, "IPN_VALUE_ENCODING"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn legacy_token_name_is_honoured() {
        let config = config_from(&[
            ("CRM_ENDPOINT_URL", "https://crm.example.com"),
            ("SF_TOKEN", "legacy"),
        ])
        .unwrap();
        assert_eq!(config.crm_token.as_deref(), Some("legacy"));
    }

    #[test]
    fn allowed_sources_parse_and_reject_garbage() {
        let config = config_from(&[
            ("CRM_ENDPOINT_URL", "https://crm.example.com"),
            ("IPN_ALLOWED_SOURCES", "197.97.145.144, 41.74.179.194,"),
        ])
        .unwrap();
        assert_eq!(config.allowed_sources.len(), 2);

        assert!(config_from(&[
            ("CRM_ENDPOINT_URL", "https://crm.example.com"),
            ("IPN_ALLOWED_SOURCES", "not-an-ip"),
        ])
        .is_err());
    }

    #[test]
    fn empty_event_log_disables_file() {
        let config = config_from(&[
            ("CRM_ENDPOINT_URL", "https://crm.example.com"),
            ("IPN_EVENT_LOG", ""),
        ])
        .unwrap();
        assert_eq!(config.event_log_path, None);
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = config_from(&[
            ("CRM_ENDPOINT_URL", "https://crm.example.com"),
            ("CRM_TOKEN", "crm-token-value"),
            ("PAYFAST_PASSPHRASE_SANDBOX", "passphrase-value"),
        ])
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("crm-token-value"));
        assert!(!rendered.contains("passphrase-value"));
    }
}
