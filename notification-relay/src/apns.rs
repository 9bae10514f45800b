//! APNS gateway client
//!
//! [`PushGateway`] is the seam between the dispatcher and the platform push
//! service. [`ApnsClient`] is the production implementation: one HTTP/2
//! connection pool and one cached provider token, shared by every request.
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


use crate::notification::Notification;
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use relay_config::ApnsConfig;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::io;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Error code attached to failures where the connection dropped mid-request
pub const TRANSIENT_ERROR_CODE: &str = "ECONNRESET";

/// APNS refuses provider tokens older than one hour
const PROVIDER_TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

/// Errors returned by a single delivery attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("Transport error: {message}")]
    Transport {
        code: Option<String>,
        message: String,
    },

    #[error("APNS rejected notification ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Provider token error: {0}")]
    ProviderToken(String),

    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl PushError {
    /// Transport-level error code, if one was classified
    pub fn code(&self) -> Option<&str> {
        match self {
            PushError::Transport { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Check if a delivery error is a transient socket-level failure
pub fn is_transient_error(error: &PushError) -> bool {
    if error.code() == Some(TRANSIENT_ERROR_CODE) {
        return true;
    }

    error.to_string().to_lowercase().contains("socket")
}

/// Trait for push gateway clients
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Make one delivery attempt
    async fn send(&self, notification: &Notification) -> Result<(), PushError>;
}

struct CachedToken {
    jwt: String,
    issued_at: Instant,
}

#[derive(Serialize)]
struct ProviderClaims<'a> {
    iss: &'a str,
    iat: i64,
}

#[derive(Deserialize)]
struct ApnsErrorBody {
    reason: String,
}

/// Token-authenticated APNS client
pub struct ApnsClient {
    http: reqwest::Client,
    base_url: String,
    team_id: String,
    key_id: String,
    signing_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl ApnsClient {
    /// Create a new APNS client from configuration
    pub fn new(config: &ApnsConfig) -> Result<Self, PushError> {
        let signing_key = EncodingKey::from_ec_pem(config.signing_key.as_bytes())
            .map_err(|e| PushError::ProviderToken(format!("Invalid signing key: {}", e)))?;

        let http = reqwest::Client::builder()
            .http2_prior_knowledge()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PushError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            base_url: format!("https://{}", config.host.trim_end_matches('/')),
            team_id: config.team_id.clone(),
            key_id: config.key_id.clone(),
            signing_key,
            token: Mutex::new(None),
        })
    }

    /// Get the provider token, re-signing it when it is close to expiry
    pub async fn provider_token(&self) -> Result<String, PushError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.issued_at.elapsed() < PROVIDER_TOKEN_TTL {
                return Ok(token.jwt.clone());
            }
        }

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());

        let claims = ProviderClaims {
            iss: &self.team_id,
            iat: chrono::Utc::now().timestamp(),
        };

        let jwt = encode(&header, &claims, &self.signing_key)
            .map_err(|e| PushError::ProviderToken(e.to_string()))?;

        *cached = Some(CachedToken {
            jwt: jwt.clone(),
            issued_at: Instant::now(),
        });

        debug!(key_id = %self.key_id, "APNS provider token signed");

        Ok(jwt)
    }
}

#[async_trait]
impl PushGateway for ApnsClient {
    async fn send(&self, notification: &Notification) -> Result<(), PushError> {
        let token = self.provider_token().await?;
        let apns_id = Uuid::new_v4();
        let url = format!("{}/3/device/{}", self.base_url, notification.device_token);

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("bearer {}", token))
            .header("apns-topic", &notification.topic)
            .header("apns-push-type", notification.kind.push_type())
            .header("apns-priority", notification.kind.priority().to_string())
            .header("apns-id", apns_id.to_string())
            .json(&notification.kind.aps_payload())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            debug!(apns_id = %apns_id, "APNS accepted notification");
            return Ok(());
        }

        let reason = match response.json::<ApnsErrorBody>().await {
            Ok(body) => body.reason,
            Err(_) => status.canonical_reason().unwrap_or("Unknown").to_string(),
        };

        Err(PushError::Rejected {
            status: status.as_u16(),
            reason,
        })
    }
}

fn transport_error(error: reqwest::Error) -> PushError {
    PushError::Transport {
        code: transport_code(&error),
        message: error.to_string(),
    }
}

/// Classify a transport failure by walking its source chain
///
/// Resets, aborted or half-closed connections and HTTP/2 GOAWAY or stream
/// resets all mean the shared connection went away under the request; they
/// carry [`TRANSIENT_ERROR_CODE`].
fn transport_code(error: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return is_reset_kind(io_err.kind()).then(|| TRANSIENT_ERROR_CODE.to_string());
        }
        if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() || hyper_err.is_closed() {
                return Some(TRANSIENT_ERROR_CODE.to_string());
            }
        }
        if let Some(h2_err) = err.downcast_ref::<h2::Error>() {
            if let Some(io_err) = h2_err.get_io() {
                return is_reset_kind(io_err.kind()).then(|| TRANSIENT_ERROR_CODE.to_string());
            }
            return is_connection_lost(h2_err).then(|| TRANSIENT_ERROR_CODE.to_string());
        }
        current = err.source();
    }
    None
}

fn is_reset_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

fn is_connection_lost(error: &h2::Error) -> bool {
    if error.is_go_away() || error.is_reset() {
        return true;
    }
    matches!(
        error.reason(),
        Some(h2::Reason::REFUSED_STREAM) | Some(h2::Reason::NO_ERROR)
    )
}
