//! Email Dispatcher
//!
//! Renders a named Handlebars template from the template directory and sends
//! it through the caller's SMTP account. Template names are restricted to
//! `[A-Za-z0-9_-]` so a request can never address a file outside the
//! template directory.
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


use crate::error::RelayError;
use crate::schemas::EmailRequest;
use crate::sender::{AttachmentRef, Mailer, OutgoingEmail, SmtpCredentials};
use handlebars::Handlebars;
use relay_config::EmailConfig;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub const TEMPLATE_EXTENSION: &str = "html";
pub const CALENDAR_INVITE_FILENAME: &str = "invite.ics";
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar";

/// Errors that can occur while rendering a template
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render template: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Templates on disk, read on every render
pub struct TemplateStore {
    dir: PathBuf,
    engine: Handlebars<'static>,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            engine: Handlebars::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check that a caller-supplied template name is a bare file stem
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, TEMPLATE_EXTENSION))
    }

    /// Read and render a template
    pub async fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        let path = self.path_for(name);
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| TemplateError::Read {
                path: path.display().to_string(),
                source,
            })?;

        Ok(self.engine.render_template(&source, data)?)
    }
}

/// Dispatcher for templated transactional email
pub struct EmailDispatcher {
    templates: TemplateStore,
    mailer: Arc<dyn Mailer>,
    app_name: String,
    support_email: String,
    calendar_base_url: String,
}

impl EmailDispatcher {
    /// Create a new email dispatcher
    pub fn new(config: &EmailConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            templates: TemplateStore::new(config.template_dir.clone()),
            mailer,
            app_name: config.app_name.clone(),
            support_email: config.support_email.clone(),
            calendar_base_url: config.calendar_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Calendar invite URL for an event
    pub fn calendar_link(&self, event_id: &str) -> String {
        format!("{}/{}.ics", self.calendar_base_url, event_id)
    }

    /// Validate, render and build the email for a request without sending it
    pub async fn prepare(&self, request: &EmailRequest) -> Result<OutgoingEmail, RelayError> {
        let (to, template, subject) = match (
            non_empty(&request.to),
            non_empty(&request.template),
            non_empty(&request.subject),
        ) {
            (Some(to), Some(template), Some(subject)) => (to, template, subject),
            _ => return Err(RelayError::MissingParams),
        };

        if !TemplateStore::is_valid_name(template) {
            return Err(RelayError::InvalidTemplate);
        }

        let calendar_link = non_empty(&request.event_id).map(|id| self.calendar_link(id));
        let username = non_empty(&request.username)
            .map(str::to_string)
            .unwrap_or_else(|| default_username(to));

        let data = json!({
            "username": username,
            "eventTitle": request.event_title,
            "eventDate": request.event_date,
            "eventTime": request.event_time,
            "eventLocation": request.event_location,
            "appName": self.app_name,
            "supportEmail": self.support_email,
            "calendarLink": calendar_link,
        });

        let html = self.templates.render(template, &data).await?;

        let attachments = calendar_link
            .into_iter()
            .map(|url| AttachmentRef {
                filename: CALENDAR_INVITE_FILENAME.to_string(),
                url,
                content_type: CALENDAR_CONTENT_TYPE.to_string(),
            })
            .collect();

        let from = match non_empty(&request.user) {
            Some(user) => format!("{} <{}>", self.app_name, user),
            None => self.support_email.clone(),
        };

        Ok(OutgoingEmail {
            from,
            to: to.to_string(),
            subject: subject.to_string(),
            html,
            attachments,
        })
    }

    /// Render and send one email
    pub async fn dispatch(&self, request: &EmailRequest) -> Result<(), RelayError> {
        let email = self.prepare(request).await?;
        let credentials = SmtpCredentials::new(request.user.as_deref(), request.pass.as_deref())?;

        info!(
            to = %email.to,
            template = request.template.as_deref().unwrap_or_default(),
            attachments = email.attachments.len(),
            "Sending email"
        );

        self.mailer.send(&credentials, &email).await?;
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Local part of the recipient address
fn default_username(to: &str) -> String {
    to.split('@').next().unwrap_or(to).to_string()
}
