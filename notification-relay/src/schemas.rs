//! Request and response bodies for the relay endpoints

use serde::{Deserialize, Serialize};

// ============================================================================
// Push
// ============================================================================

/// Optional alert text for `POST /send-apn`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Body of `POST /send-apn`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushRequest {
    #[serde(default)]
    pub tokens: Option<Vec<String>>,
    #[serde(default)]
    pub payload: Option<PushPayload>,
    /// `"silent"` selects a background push; anything else is an alert
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Successful `POST /send-apn` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    pub success: bool,
    pub duration: String,
    pub delivered: usize,
    pub retried: usize,
    pub failed: usize,
}

// ============================================================================
// Email
// ============================================================================

/// Body of `POST /send-email`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub to: Option<String>,
    pub template: Option<String>,
    pub subject: Option<String>,
    /// SMTP username, also used as the sender address
    pub user: Option<String>,
    /// SMTP password
    pub pass: Option<String>,
    /// Greeting name; defaults to the local part of `to`
    pub username: Option<String>,
    pub event_title: Option<String>,
    pub event_date: Option<String>,
    pub event_time: Option<String>,
    pub event_location: Option<String>,
    pub event_id: Option<String>,
}

/// Successful `POST /send-email` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailResponse {
    pub success: bool,
}

/// Error body shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
