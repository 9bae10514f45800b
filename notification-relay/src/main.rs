//! Notification Relay
//!
//! Accepts authenticated requests from internal callers and relays them as
//! APNS push notifications or templated SMTP email.

use anyhow::Result;
use notification_relay::apns::{ApnsClient, PushGateway};
use notification_relay::email::EmailDispatcher;
use notification_relay::push::PushDispatcher;
use notification_relay::sender::{Mailer, SmtpMailer};
use notification_relay::server::{AppState, RelayServer};
use notification_relay::SERVICE_NAME;
use relay_config::RelayConfig;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = RelayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    relay_logging::init(SERVICE_NAME, config.log_format, config.log_level())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        port = config.port,
        apns_host = %config.apns.host,
        apns_topic = %config.apns.topic,
        max_concurrency = config.push.max_concurrency,
        template_dir = %config.email.template_dir.display(),
        "Configuration loaded"
    );

    // One gateway client for the life of the process
    let gateway: Arc<dyn PushGateway> = Arc::new(
        ApnsClient::new(&config.apns)
            .map_err(|e| anyhow::anyhow!("Failed to create APNS client: {}", e))?,
    );
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(&config.smtp));

    let state = AppState::new(
        config.api_secret.clone(),
        PushDispatcher::new(gateway, config.apns.topic.clone(), config.push.max_concurrency),
        EmailDispatcher::new(&config.email, mailer),
    );

    RelayServer::new(config.listen_addr(), state).start().await
}
