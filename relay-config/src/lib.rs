//! Configuration management for the notification relay
//!
//! Settings come from the process environment (optionally seeded from a
//! `.env` file). Variable names are matched case-insensitively.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_APNS_HOST: &str = "api.push.apple.com";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PUSH_MAX_CONCURRENCY: usize = 64;
pub const DEFAULT_PUSH_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";
pub const DEFAULT_APP_NAME: &str = "Coordiy";
pub const DEFAULT_SUPPORT_EMAIL: &str = "support@coordiy.com";
pub const DEFAULT_CALENDAR_BASE_URL: &str = "https://api.coordiy.com/calendar";

/// APNs provider configuration
#[derive(Debug, Clone)]
pub struct ApnsConfig {
    pub team_id: String,
    pub key_id: String,
    /// PKCS#8 PEM with real newlines
    pub signing_key: String,
    /// Bundle id used as the `apns-topic`
    pub topic: String,
    pub host: String,
    pub request_timeout_secs: u64,
}

/// Push fan-out configuration
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Upper bound on in-flight deliveries for one request
    pub max_concurrency: usize,
}

/// SMTP relay endpoint. Credentials are supplied per request.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
}

/// Email rendering configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub template_dir: PathBuf,
    pub app_name: String,
    pub support_email: String,
    pub calendar_base_url: String,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Console,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_secret: String,
    pub port: u16,
    pub apns: ApnsConfig,
    pub push: PushConfig,
    pub smtp: SmtpConfig,
    pub email: EmailConfig,
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Flat view of the environment as the `config` crate sees it
#[derive(Debug, Deserialize)]
struct EnvSettings {
    api_secret: String,
    apns_team_id: String,
    apns_key_id: String,
    apns_signing_key: String,
    apns_topic: String,
    apns_host: String,
    port: u16,
    push_max_concurrency: usize,
    push_request_timeout_secs: u64,
    smtp_host: String,
    smtp_port: u16,
    template_dir: String,
    app_name: String,
    support_email: String,
    calendar_base_url: String,
    log_level: String,
    log_format: LogFormat,
}

impl RelayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_environment(Environment::default())
    }

    /// Load configuration from an explicit environment source
    pub fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let settings: EnvSettings = Config::builder()
            .set_default("apns_host", DEFAULT_APNS_HOST)?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("push_max_concurrency", DEFAULT_PUSH_MAX_CONCURRENCY as i64)?
            .set_default(
                "push_request_timeout_secs",
                DEFAULT_PUSH_REQUEST_TIMEOUT_SECS as i64,
            )?
            .set_default("smtp_host", DEFAULT_SMTP_HOST)?
            .set_default("smtp_port", i64::from(DEFAULT_SMTP_PORT))?
            .set_default("template_dir", DEFAULT_TEMPLATE_DIR)?
            .set_default("app_name", DEFAULT_APP_NAME)?
            .set_default("support_email", DEFAULT_SUPPORT_EMAIL)?
            .set_default("calendar_base_url", DEFAULT_CALENDAR_BASE_URL)?
            .set_default("log_level", "info")?
            .set_default("log_format", "json")?
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        if settings.push_max_concurrency == 0 {
            return Err(ConfigError::Message(
                "PUSH_MAX_CONCURRENCY must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_secret: settings.api_secret,
            port: settings.port,
            apns: ApnsConfig {
                team_id: settings.apns_team_id,
                key_id: settings.apns_key_id,
                signing_key: unescape_pem(&settings.apns_signing_key),
                topic: settings.apns_topic,
                host: settings.apns_host,
                request_timeout_secs: settings.push_request_timeout_secs,
            },
            push: PushConfig {
                max_concurrency: settings.push_max_concurrency,
            },
            smtp: SmtpConfig {
                host: settings.smtp_host,
                port: settings.smtp_port,
            },
            email: EmailConfig {
                template_dir: PathBuf::from(settings.template_dir),
                app_name: settings.app_name,
                support_email: settings.support_email,
                calendar_base_url: settings.calendar_base_url.trim_end_matches('/').to_string(),
            },
            log_level: settings.log_level,
            log_format: settings.log_format,
        })
    }

    /// Get the listen address
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        if self.log_level.is_empty() {
            "info"
        } else {
            &self.log_level
        }
    }
}

/// Single-line env values carry the PEM with literal `\n` sequences
fn unescape_pem(raw: &str) -> String {
    raw.replace("\\n", "\n")
}
