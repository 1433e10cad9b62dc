//! Server configuration: CLI flags with env-var fallbacks.
//!
//! Credentials default to empty strings rather than being required, so the
//! binary can start in a degraded mode and log what is missing; tests build
//! configs with struct-update syntax against `Default`.

use clap::Parser;

use crate::discord::{DEFAULT_API_BASE, DEFAULT_AUTHORIZE_URL, DEFAULT_CDN_BASE};

#[derive(Parser, Debug, Clone)]
#[command(name = "gatewarden-server", about = "Discord OAuth verification gate")]
pub struct ServerConfig {
    /// Address for the HTTP listener.
    #[arg(long, env = "GATEWARDEN_ADDR", default_value = "0.0.0.0:8089")]
    pub listen_addr: String,

    /// Externally visible base URL; the OAuth redirect URI is derived from
    /// it and must match the application settings on the provider side.
    #[arg(long, env = "GATEWARDEN_PUBLIC_URL", default_value = "http://127.0.0.1:8089")]
    pub public_url: String,

    /// OAuth application client id.
    #[arg(long, env = "DISCORD_CLIENT_ID", default_value = "")]
    pub client_id: String,

    /// OAuth application client secret.
    #[arg(long, env = "DISCORD_CLIENT_SECRET", default_value = "")]
    pub client_secret: String,

    /// Bot credential used for the privileged guild mutations.
    #[arg(long, env = "DISCORD_BOT_TOKEN", default_value = "")]
    pub bot_token: String,

    /// The managed guild.
    #[arg(long, env = "DISCORD_GUILD_ID", default_value = "")]
    pub guild_id: String,

    /// Role granted after successful verification.
    #[arg(long, env = "DISCORD_VERIFIED_ROLE_ID", default_value = "")]
    pub verified_role_id: String,

    /// Webhook that receives one audit embed per verification. Audit is
    /// disabled when unset.
    #[arg(long, env = "AUDIT_WEBHOOK_URL")]
    pub audit_webhook_url: Option<String>,

    /// Bearer token required by POST /api/v1/pull. The pull endpoint is
    /// disabled when unset.
    #[arg(long, env = "GATEWARDEN_OPERATOR_TOKEN")]
    pub operator_token: Option<String>,

    /// Discord REST base. Overridden in tests to point at a mock provider.
    #[arg(long, env = "DISCORD_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Discord CDN base, used for avatar URL derivation.
    #[arg(long, env = "DISCORD_CDN_BASE", default_value = DEFAULT_CDN_BASE)]
    pub cdn_base: String,

    /// Browser-facing authorize page.
    #[arg(long, env = "DISCORD_AUTHORIZE_URL", default_value = DEFAULT_AUTHORIZE_URL)]
    pub authorize_url: String,

    /// Bound on every outbound provider call, in seconds.
    #[arg(long, env = "GATEWARDEN_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// The OAuth callback this server answers on.
    pub fn redirect_uri(&self) -> String {
        format!("{}/verify/callback", self.public_url.trim_end_matches('/'))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: "0.0.0.0:8089".to_string(),
            public_url: "http://127.0.0.1:8089".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            bot_token: String::new(),
            guild_id: String::new(),
            verified_role_id: String::new(),
            audit_webhook_url: None,
            operator_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            cdn_base: DEFAULT_CDN_BASE.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            request_timeout_secs: 10,
        }
    }
}
