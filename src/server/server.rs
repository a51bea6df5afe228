//! Kiosk HTTP server with axum router and graceful shutdown.

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

use super::handlers::{get_health, post_chat, post_feedback, ws_subscribe, AppState};

/// Kiosk HTTP server exposing the chat, feedback, health and subscription
/// endpoints.
pub struct KioskServer {
    config: ServerConfig,
    state: AppState,
}

impl KioskServer {
    /// Create a new server with default configuration.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            config: ServerConfig::default(),
            state,
        }
    }

    /// Set the server configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/api/chat", post(post_chat))
            .route("/api/feedback", post(post_feedback))
            .route("/api/health", get(get_health))
            .route("/ws", get(ws_subscribe))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Run the server, binding to the configured address.
    ///
    /// The server will run until the cancellation token is triggered, at
    /// which point it performs a graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or serve.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.address();
        let cancel = self.state.cancel.clone();
        let app = self.build_router();

        tracing::info!(address = %addr, "Starting kiosk server");

        let listener = TcpListener::bind(&addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Kiosk server shutting down gracefully");
            })
            .await
    }
}
