use crate::{AdmissionGate, RunError, RunRequest, RunResult, ServerConfig};

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    gate: AdmissionGate,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let gate = AdmissionGate::new(config.max_concurrency);
        Self {
            config: Arc::new(config),
            gate,
        }
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}

/// `POST /run` executes code; every other method and path is served from the
/// static directory.
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route(
            "/run",
            post(run_handler).fallback_service(static_files.clone()),
        )
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn run_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<RunResult>, RunError> {
    let body = body?;

    let request: RunRequest = serde_json::from_slice(&body)
        .map_err(|err| RunError::MalformedRequest(err.to_string()))?;

    let _admission = state.gate.try_admit()?;

    let result = crate::run(&state.config, &request.code).await?;
    Ok(Json(result))
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind: addr = {}", config.bind))?;

    let addr = listener.local_addr()?;
    let state = AppState::new(config);

    info!(
        %addr,
        interpreter = %state.config.interpreter.display(),
        static_dir = %state.config.static_dir.display(),
        max_concurrency = state.gate.capacity(),
        "server running at http://{}",
        addr
    );

    let app = router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
