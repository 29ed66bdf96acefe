use std::sync::Arc;

use actix_web::web;
use ipn::Verifier;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::event_log::EventLog;
use crate::relay::CrmRelay;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    /// Built once from the active mode's passphrase and policy
    pub verifier: Arc<Verifier>,
    pub relay: CrmRelay,
    /// Append-only notification log (None when disabled)
    pub event_log: Option<Arc<EventLog>>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let verifier = config.verifier();
        let relay = CrmRelay::from_config(&config)?;

        let event_log = match config.event_log_path {
            Some(ref path) => Some(Arc::new(EventLog::open(path).map_err(|e| {
                RelayError::Internal(format!(
                    "failed to open event log {}: {e}",
                    path.display()
                ))
            })?)),
            None => None,
        };

        Ok(Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            relay,
            event_log,
        })
    }

    /// Write to the event log if one is configured.
    ///
    /// The file write runs on actix's blocking pool so a slow disk never
    /// stalls the worker serving requests.
    pub async fn log_event(&self, message: String) {
        let Some(log) = self.event_log.clone() else {
            return;
        };
        if let Err(e) = web::block(move || log.record(&message)).await {
            tracing::warn!(error = %e, "event log task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ipn::{CanonicalPolicy, Mode, Passphrases};

    use super::*;

    fn config(event_log_path: Option<std::path::PathBuf>) -> RelayConfig {
        RelayConfig {
            port: 0,
            mode: Mode::Sandbox,
            passphrases: Passphrases::new(None, None),
            policy: CanonicalPolicy::default(),
            crm_endpoint: "http://127.0.0.1:1/crm".to_string(),
            crm_token: None,
            relay_timeout: Duration::from_secs(1),
            relay_signing_secret: None,
            allowed_sources: vec![],
            trust_forwarded_for: false,
            rate_limit_rpm: 120,
            metrics_token: None,
            event_log_path,
        }
    }

    #[actix_rt::test]
    async fn log_event_writes_off_the_worker_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("webhook.log");
        let state = AppState::new(config(Some(path.clone()))).unwrap();

        for n in 0..5 {
            state.log_event(format!("event {n}")).await;
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        for (n, line) in lines.iter().enumerate() {
            assert!(line.ends_with(&format!("] event {n}")), "{line}");
        }
    }

    #[actix_rt::test]
    async fn log_event_without_log_is_a_no_op() {
        let state = AppState::new(config(None)).unwrap();
        assert!(state.event_log.is_none());
        state.log_event("ignored".to_string()).await;
    }
}
