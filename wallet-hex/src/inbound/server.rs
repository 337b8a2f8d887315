//! HTTP Server configuration and startup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware, routing::{get, post}};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use wallet_types::LedgerRepository;

use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::WalletService;
use crate::openapi::ApiDoc;

/// HTTP Server for the Wallet API.
pub struct HttpServer<R: LedgerRepository> {
    state: Arc<AppState<R>>,
    requests_per_minute: u32,
    trust_forwarded_for: bool,
}

impl<R: LedgerRepository> HttpServer<R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: WalletService<R>) -> Self {
        Self::from_shared(Arc::new(service))
    }

    /// Creates a server around a service that is also used elsewhere,
    /// such as by the expired payment reaper.
    pub fn from_shared(service: Arc<WalletService<R>>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            requests_per_minute: 100,
            trust_forwarded_for: false,
        }
    }

    /// Replaces the default rate limit.
    pub fn with_rate_limit(mut self, requests_per_minute: u32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    /// Rate limits by the proxy-appended `X-Forwarded-For` hop instead of
    /// the peer address.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn service(&self) -> Arc<WalletService<R>> {
        self.state.service.clone()
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();
        let rate_limiter = Arc::new(
            RateLimiterState::new(self.requests_per_minute, Duration::from_secs(60))
                .trust_forwarded_for(self.trust_forwarded_for),
        );

        let api = Router::new()
            .route("/health", get(handlers::health))
            .route("/api/clients/register", post(handlers::register::<R>))
            .route("/api/clients/recharge", post(handlers::recharge::<R>))
            .route(
                "/api/clients/payment/initiate",
                post(handlers::initiate_payment::<R>),
            )
            .route(
                "/api/clients/payment/confirm",
                post(handlers::confirm_payment::<R>),
            )
            .route("/api/clients/balance", post(handlers::check_balance::<R>))
            .route(
                "/api/clients/transactions",
                post(handlers::transaction_history::<R>),
            )
            .with_state(self.state.clone());

        Router::new()
            .merge(SwaggerUi::new("/api/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .merge(api)
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                rate_limiter,
                rate_limit_middleware,
            ))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        // Peer addresses key the rate limiter.
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
