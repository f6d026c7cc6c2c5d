//! Application startup and lifecycle management.

use crate::config::Config;
use crate::handlers;
use crate::services::{Database, PayoutService, TransferClient};
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub payouts: PayoutService,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        db.run_migrations().await?;

        let transfer = TransferClient::new(config.transfer.clone());
        if transfer.is_configured() {
            tracing::info!("Transfer provider client initialized");
        } else {
            tracing::warn!(
                "Transfer provider credentials not configured - payout settlement will fail"
            );
        }

        let payouts = PayoutService::new(db.clone(), transfer);

        let state = AppState {
            db,
            config: config.clone(),
            payouts,
        };

        // Bind listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Payout service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the application state.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router).await
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        // Analytics views (read-only)
        .route("/analytics/funnel", get(handlers::analytics::funnel))
        .route("/analytics/fees", get(handlers::analytics::fees))
        .route("/analytics/products", get(handlers::analytics::products))
        .route(
            "/analytics/redemption-delay",
            get(handlers::analytics::redemption_delay),
        )
        .route("/analytics/viral", get(handlers::analytics::viral))
        .route("/analytics/revenue", get(handlers::analytics::revenue))
        .route("/analytics/report", get(handlers::analytics::report))
        // Payout actions
        .route("/payouts/pending", get(handlers::payouts::pending_totals))
        .route("/payouts/recent", get(handlers::payouts::recent_paid))
        .route("/payouts/backfill", post(handlers::payouts::backfill))
        .route("/payouts/mark-paid", post(handlers::payouts::mark_paid))
        .route("/payouts/run", post(handlers::payouts::run_payouts))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
