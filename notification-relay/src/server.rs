//! HTTP surface for the relay
//!
//! `POST /send-apn` and `POST /send-email` sit behind the bearer gate;
//! `GET /health` is open for orchestration health checks.
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::auth::require_bearer;
use crate::email::EmailDispatcher;
use crate::error::RelayError;
use crate::push::PushDispatcher;
use crate::schemas::{EmailRequest, EmailResponse, PushRequest, PushResponse};
use crate::SERVICE_NAME;
use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub api_secret: Arc<str>,
    pub push: Arc<PushDispatcher>,
    pub email: Arc<EmailDispatcher>,
}

impl AppState {
    pub fn new(
        api_secret: impl Into<Arc<str>>,
        push: PushDispatcher,
        email: EmailDispatcher,
    ) -> Self {
        Self {
            api_secret: api_secret.into(),
            push: Arc::new(push),
            email: Arc::new(email),
        }
    }
}

/// Build the relay router
pub fn router(state: AppState) -> Router {
    let relay = Router::new()
        .route("/send-apn", post(send_apn))
        .route("/send-email", post(send_email))
        .route_layer(middleware::from_fn_with_state(
            state.api_secret.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(relay)
        .with_state(state)
}

/// Relay HTTP server
pub struct RelayServer {
    addr: String,
    state: AppState,
}

impl RelayServer {
    /// Create a new relay server
    pub fn new(addr: impl Into<String>, state: AppState) -> Self {
        Self {
            addr: addr.into(),
            state,
        }
    }

    /// Start the server and run until a shutdown signal arrives
    pub async fn start(self) -> anyhow::Result<()> {
        let app = router(self.state);

        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind relay server to {}: {}", self.addr, e))?;

        info!(addr = %self.addr, "Relay server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow::anyhow!("Relay server error: {}", e))?;

        info!("Relay server stopped");
        Ok(())
    }
}

/// `POST /send-apn`
async fn send_apn(
    State(state): State<AppState>,
    payload: Result<Json<PushRequest>, JsonRejection>,
) -> Result<Json<PushResponse>, RelayError> {
    let started = Instant::now();
    let Json(request) = payload.map_err(|rejection| {
        error!(error = %rejection.body_text(), "Push request body rejected");
        RelayError::from(rejection)
    })?;

    let report = state.push.dispatch(&request).await.map_err(|e| {
        error!(error = %e, "Push request failed");
        e
    })?;

    Ok(Json(PushResponse {
        success: true,
        duration: format!("{}ms", started.elapsed().as_millis()),
        delivered: report.delivered,
        retried: report.retried,
        failed: report.failed,
    }))
}

/// `POST /send-email`
async fn send_email(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<EmailResponse>, RelayError> {
    let Json(request) = payload.map_err(|rejection| {
        error!(error = %rejection.body_text(), "Email request body rejected");
        RelayError::from(rejection)
    })?;

    state.email.dispatch(&request).await.map_err(|e| {
        error!(error = %e, "Email request failed");
        e
    })?;

    Ok(Json(EmailResponse { success: true }))
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal (Ctrl+C) received");
        },
        _ = terminate => {
            info!("Shutdown signal (SIGTERM) received");
        },
    }
}
