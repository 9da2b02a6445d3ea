//! HTTP layer built on Axum.
//!
//! Routes:
//! - `POST /query` answers a question with the closest document
//! - `GET /` serves the landing page from the static directory
//! - `GET /static/*` serves the rest of the static directory
//! - `GET /health` reports the service state

pub mod errors;
pub mod handlers;


use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::ServiceContext;
use handlers::AppState;

#[inline]
pub fn create_router(context: Arc<ServiceContext>, static_dir: PathBuf) -> Router {
    let state = AppState {
        context,
        static_dir: static_dir.clone(),
    };

    Router::new()
        .route("/", get(handlers::landing_page))
        .route("/query", post(handlers::query))
        .route("/health", get(handlers::health))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until SIGINT or SIGTERM
#[inline]
pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("Failed to read listener address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_signal())
        .await
        .context("HTTP server failed")
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
