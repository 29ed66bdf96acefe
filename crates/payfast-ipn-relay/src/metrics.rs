use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::{LazyLock, Once};

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Notifications by outcome: authentic, invalid_signature, malformed, forbidden
pub static NOTIFICATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("ipn_notifications_total", "IPN notifications received"),
        &["outcome"],
    )
    .unwrap()
});

pub static RELAY_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("ipn_relay_total", "Notifications relayed to the CRM"),
        &["result"],
    )
    .unwrap()
});

pub static RELAY_LATENCY: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new("ipn_relay_duration_seconds", "CRM relay latency in seconds")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["result"],
    )
    .unwrap()
});

static REGISTER: Once = Once::new();

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(NOTIFICATIONS_TOTAL.clone()))
            .unwrap();
        REGISTRY.register(Box::new(RELAY_TOTAL.clone())).unwrap();
        REGISTRY.register(Box::new(RELAY_LATENCY.clone())).unwrap();
    });
}

pub fn metrics_output() -> String {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
