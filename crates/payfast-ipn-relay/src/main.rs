use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ipn_relay::{config::RelayConfig, metrics::register_metrics, routes, state::AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    let port = config.port;
    let rate_limit_rpm = config.rate_limit_rpm;

    tracing::info!("Starting payfast-ipn-relay on port {}", port);
    tracing::info!("Mode: {}", config.mode);
    tracing::info!("Canonical policy: {}", config.policy);
    tracing::info!(
        "Passphrase: {}",
        if config.passphrases.for_mode(config.mode).is_some() {
            "set"
        } else {
            "not set"
        }
    );
    tracing::info!("CRM endpoint: {}", config.crm_endpoint);
    if config.allowed_sources.is_empty() {
        tracing::info!("Source allowlist: disabled (any address may post)");
    } else {
        tracing::info!("Source allowlist: {} addresses", config.allowed_sources.len());
    }

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialise relay: {e}");
            std::process::exit(1);
        }
    };
    if let Some(ref log) = state.event_log {
        tracing::info!("Event log: {}", log.path().display());
    }
    state.log_event(format!("Server started on port {port}")).await;

    register_metrics();

    let state_data = web::Data::new(state);

    let governor_conf = match GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm as u64)
        .finish()
    {
        Some(conf) => conf,
        None => {
            tracing::error!("Invalid RATE_LIMIT_RPM: {rate_limit_rpm}");
            std::process::exit(1);
        }
    };

    tracing::info!("  POST http://localhost:{port}/payfast-notify");
    tracing::info!("  GET  http://localhost:{port}/health");

    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .app_data(web::PayloadConfig::new(64 * 1024))
            .wrap(Logger::default())
            .wrap(Governor::new(&governor_conf))
            .configure(routes::health::configure)
            .configure(routes::notify::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
