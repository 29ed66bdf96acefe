use std::time::Instant;

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use ipn::{IpnError, Payload};

use crate::error::RelayError;
use crate::metrics::{NOTIFICATIONS_TOTAL, RELAY_LATENCY, RELAY_TOTAL};
use crate::state::AppState;
use crate::validation::{client_ip, is_allowed_source};

/// Parse the body as JSON when the sender says so, as form data otherwise.
/// Media types compare case-insensitively.
pub fn parse_payload(req: &HttpRequest, body: &[u8]) -> Result<Payload, IpnError> {
    if req.content_type().eq_ignore_ascii_case("application/json") {
        Payload::from_json_slice(body)
    } else {
        Payload::from_form(body)
    }
}

/// Short identifier for log lines: the merchant and gateway payment ids when present.
fn payment_ref(payload: &Payload) -> String {
    format!(
        "m_payment_id={} pf_payment_id={}",
        payload.get("m_payment_id").unwrap_or("-"),
        payload.get("pf_payment_id").unwrap_or("-")
    )
}

/// POST /payfast-notify - receive, verify and relay one notification
pub async fn payfast_notify(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, RelayError> {
    let source = client_ip(&req, state.config.trust_forwarded_for);
    if !is_allowed_source(source, &state.config.allowed_sources) {
        let shown = source
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::warn!(source = %shown, "IPN from disallowed source");
        NOTIFICATIONS_TOTAL.with_label_values(&["forbidden"]).inc();
        state.log_event(format!("Rejected: source {shown} not allowed")).await;
        return Err(RelayError::ForbiddenSource(shown));
    }

    let payload = match parse_payload(&req, &body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "IPN body rejected");
            NOTIFICATIONS_TOTAL.with_label_values(&["malformed"]).inc();
            state.log_event(format!("Error: {e}")).await;
            return Err(e.into());
        }
    };

    let received = serde_json::to_string(&payload).unwrap_or_default();
    state.log_event(format!("Received: {received}")).await;

    let reference = payment_ref(&payload);

    if !state.verifier.verify(&payload) {
        tracing::warn!(
            payment = %reference,
            has_signature = payload.signature().is_some(),
            "IPN signature mismatch"
        );
        NOTIFICATIONS_TOTAL
            .with_label_values(&["invalid_signature"])
            .inc();
        state.log_event(format!("Rejected: invalid signature ({reference})")).await;
        return Err(RelayError::InvalidSignature);
    }

    NOTIFICATIONS_TOTAL.with_label_values(&["authentic"]).inc();
    tracing::info!(payment = %reference, fields = payload.len(), "IPN verified");

    let start = Instant::now();
    match state.relay.forward(&payload).await {
        Ok(status) => {
            let elapsed = start.elapsed().as_secs_f64();
            RELAY_TOTAL.with_label_values(&["success"]).inc();
            RELAY_LATENCY
                .with_label_values(&["success"])
                .observe(elapsed);
            tracing::info!(payment = %reference, status = %status, "IPN relayed to CRM");
            state.log_event(format!("CRM response: {}", status.as_u16())).await;
            Ok(HttpResponse::Ok().content_type("text/plain").body("OK"))
        }
        Err(e) => {
            let elapsed = start.elapsed().as_secs_f64();
            RELAY_TOTAL.with_label_values(&["failure"]).inc();
            RELAY_LATENCY
                .with_label_values(&["failure"])
                .observe(elapsed);
            state.log_event(format!("Error: {e}")).await;
            Err(e)
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/payfast-notify", web::post().to(payfast_notify));
}
