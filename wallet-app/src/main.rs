//! # Wallet Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter and the notifier
//! - Create the wallet service
//! - Start the expired payment reaper (when enabled)
//! - Start the HTTP server

mod config;

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_hex::{ExpiredPaymentReaper, WalletPolicy, WalletService, inbound::HttpServer};
use wallet_repo::{HttpRelayNotifier, LogNotifier, build_repo};
use wallet_types::Notifier;

/// Upper bound on a single relay request, and on waiting for token delivery.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("wallet-service"), provider))
}

fn build_notifier(config: &config::Config) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.notify_relay_url {
        Some(url) => {
            tracing::info!("Sending notifications through relay {}", url);
            let relay = HttpRelayNotifier::new(
                url.clone(),
                config.notify_relay_secret.clone(),
                config.notify_from.clone(),
                NOTIFY_TIMEOUT,
            )?;
            Ok(Arc::new(relay))
        }
        None => {
            tracing::warn!(
                "NOTIFY_LOG_ONLY is set; notifications are only logged and payment tokens are returned in responses"
            );
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Export spans only when a collector is configured
    let otel = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(_) => Some(init_tracer()?),
        Err(_) => None,
    };
    let (otel_tracer, otel_provider) = otel.unzip();
    let telemetry = otel_tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wallet_app=debug,wallet_hex=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting wallet server on port {}", config.port);

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;
    tracing::info!("Using {} ledger store", repo.backend());

    let notifier = build_notifier(&config)?;
    let policy = WalletPolicy {
        max_amount: config.max_amount,
        token_ttl: chrono::Duration::seconds(config.token_ttl_secs),
        token_send_timeout: NOTIFY_TIMEOUT,
    };

    // Create the wallet service, shared with the reaper
    let service = Arc::new(WalletService::new(repo, notifier, policy));

    if let Some(secs) = config.reaper_interval_secs {
        let reaper = ExpiredPaymentReaper::new(service.clone(), Duration::from_secs(secs));
        tokio::spawn(reaper.run());
    }

    // Create and run the HTTP server
    let server = HttpServer::from_shared(service)
        .with_rate_limit(config.rate_limit_per_minute)
        .trust_forwarded_for(config.trust_forwarded_for);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
