//! Push notification construction
//!
//! One [`Notification`] is built per device token. The variant is chosen
//! solely by the request's `type` field.
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


use crate::schemas::PushPayload;
use serde_json::{json, Value};

/// Request `type` that selects a background push
pub const SILENT_TYPE: &str = "silent";
pub const DEFAULT_ALERT_TITLE: &str = "Coordiy Update";
pub const DEFAULT_ALERT_BODY: &str = "Event changed";
pub const DEFAULT_SOUND: &str = "default";

/// Notification variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    /// Background refresh, no user-visible alert
    Silent,
    /// Visible alert with sound
    Alert {
        title: String,
        body: String,
        sound: String,
    },
}

impl NotificationKind {
    /// Pick the variant for a request. Unknown `type` values fall into the alert path.
    pub fn from_request(kind: Option<&str>, payload: Option<&PushPayload>) -> Self {
        if kind == Some(SILENT_TYPE) {
            return NotificationKind::Silent;
        }

        let title = payload
            .and_then(|p| p.title.clone())
            .unwrap_or_else(|| DEFAULT_ALERT_TITLE.to_string());
        let body = payload
            .and_then(|p| p.body.clone())
            .unwrap_or_else(|| DEFAULT_ALERT_BODY.to_string());

        NotificationKind::Alert {
            title,
            body,
            sound: DEFAULT_SOUND.to_string(),
        }
    }

    pub fn is_background(&self) -> bool {
        matches!(self, NotificationKind::Silent)
    }

    /// Value of the `apns-push-type` header
    pub fn push_type(&self) -> &'static str {
        match self {
            NotificationKind::Silent => "background",
            NotificationKind::Alert { .. } => "alert",
        }
    }

    /// Value of the `apns-priority` header. APNS rejects background pushes sent at 10.
    pub fn priority(&self) -> u8 {
        match self {
            NotificationKind::Silent => 5,
            NotificationKind::Alert { .. } => 10,
        }
    }

    /// JSON body posted to APNS
    pub fn aps_payload(&self) -> Value {
        match self {
            NotificationKind::Silent => json!({
                "aps": { "content-available": 1 }
            }),
            NotificationKind::Alert { title, body, sound } => json!({
                "aps": {
                    "alert": { "title": title, "body": body },
                    "sound": sound,
                }
            }),
        }
    }
}

/// A notification addressed to a single device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub device_token: String,
    /// Bundle id sent as `apns-topic`
    pub topic: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn new(
        device_token: impl Into<String>,
        topic: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            device_token: device_token.into(),
            topic: topic.into(),
            kind,
        }
    }
}
