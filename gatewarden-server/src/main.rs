use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Use JSON logs in production (GATEWARDEN_LOG_JSON=1), human-readable otherwise
    let json_logs = std::env::var("GATEWARDEN_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::from_default_env().add_directive("gatewarden_server=info".parse()?);
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .init();
    }

    let config = gatewarden_server::config::ServerConfig::parse();
    tracing::info!("Starting gatewarden on {}", config.listen_addr);
    tracing::info!("OAuth redirect URI: {}", config.redirect_uri());
    if config.client_id.is_empty() || config.client_secret.is_empty() {
        tracing::warn!("Discord client id/secret not set; verification will fail at the exchange");
    }
    if config.bot_token.is_empty() {
        tracing::warn!("Discord bot token not set; role grants and pulls will fail");
    }
    if config.operator_token.is_none() {
        tracing::warn!("No operator token configured; the pull endpoint is disabled");
    }
    if config.audit_webhook_url.is_none() {
        tracing::info!("Audit webhook not configured");
    }

    let server = gatewarden_server::server::Server::new(config);
    server.run().await
}
