//! Shared fakes for relay integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use notification_relay::apns::{PushError, PushGateway, TRANSIENT_ERROR_CODE};
use notification_relay::email::EmailDispatcher;
use notification_relay::notification::Notification;
use notification_relay::push::PushDispatcher;
use notification_relay::sender::{MailError, Mailer, OutgoingEmail, SmtpCredentials};
use notification_relay::server::AppState;
use relay_config::EmailConfig;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SECRET: &str = "test-secret";
pub const TOPIC: &str = "com.coordiy.app";

pub fn socket_error() -> PushError {
    PushError::Transport {
        code: None,
        message: "socket hang up".to_string(),
    }
}

pub fn reset_error() -> PushError {
    PushError::Transport {
        code: Some(TRANSIENT_ERROR_CODE.to_string()),
        message: "connection reset by peer".to_string(),
    }
}

pub fn bad_token_error() -> PushError {
    PushError::Rejected {
        status: 400,
        reason: "BadDeviceToken".to_string(),
    }
}

/// Gateway that replays scripted results, then falls back to a default
pub struct FakeGateway {
    script: Mutex<VecDeque<Result<(), PushError>>>,
    fallback: Result<(), PushError>,
    delay: Option<Duration>,
    sent: Mutex<Vec<Notification>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeGateway {
    pub fn accepting() -> Self {
        Self::with_fallback(Ok(()))
    }

    pub fn failing(error: PushError) -> Self {
        Self::with_fallback(Err(error))
    }

    pub fn with_fallback(fallback: Result<(), PushError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            delay: None,
            sent: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn scripted(results: Vec<Result<(), PushError>>, fallback: Result<(), PushError>) -> Self {
        let gateway = Self::with_fallback(fallback);
        *gateway.script.lock().unwrap() = results.into();
        gateway
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushGateway for FakeGateway {
    async fn send(&self, notification: &Notification) -> Result<(), PushError> {
        self.sent.lock().unwrap().push(notification.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Mailer that records what it was asked to send
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, OutgoingEmail)>>,
    fail_with: Option<String>,
}

impl RecordingMailer {
    pub fn failing(message: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<(String, OutgoingEmail)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        email: &OutgoingEmail,
    ) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap()
            .push((credentials.user.clone(), email.clone()));

        match &self.fail_with {
            Some(message) => Err(MailError::Attachment {
                url: "smtp://test".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

pub fn email_config(template_dir: &Path) -> EmailConfig {
    EmailConfig {
        template_dir: template_dir.to_path_buf(),
        app_name: "Coordiy".to_string(),
        support_email: "support@coordiy.com".to_string(),
        calendar_base_url: "https://api.coordiy.com/calendar".to_string(),
    }
}

/// Write `invite.html` into the directory
pub fn write_invite_template(dir: &Path) {
    std::fs::write(
        dir.join("invite.html"),
        concat!(
            "<h1>{{eventTitle}}</h1><p>Hi {{username}}</p>",
            "{{#if calendarLink}}<a href=\"{{calendarLink}}\">Add</a>{{/if}}",
            "<footer>{{supportEmail}}</footer>",
        ),
    )
    .unwrap();
}

pub fn app_state(
    gateway: Arc<FakeGateway>,
    mailer: Arc<RecordingMailer>,
    template_dir: &Path,
) -> AppState {
    AppState::new(
        SECRET,
        PushDispatcher::new(gateway, TOPIC, 16),
        EmailDispatcher::new(&email_config(template_dir), mailer),
    )
}
