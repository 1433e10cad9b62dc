//! Server assembly: shared state construction and the HTTP listener.
//!
//! Everything the handlers and the session need lives in one `SharedState`
//! built once at startup and passed around as an `Arc`. There is no other
//! shared mutable state in the process.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::audit::AuditWebhook;
use crate::config::ServerConfig;
use crate::discord::guild::GuildClient;
use crate::discord::oauth::OauthClient;
use crate::store::GrantStore;
use crate::web;

pub struct SharedState {
    pub config: ServerConfig,
    pub store: GrantStore,
    pub oauth: OauthClient,
    pub guild: GuildClient,
    /// Audit sink; `None` disables auditing entirely.
    pub audit: Option<AuditWebhook>,
    /// In-flight verification state tokens → mint time.
    pub pending: Mutex<HashMap<String, Instant>>,
}

pub struct Server {
    state: Arc<SharedState>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let http = crate::discord::http_client(config.request_timeout_secs);

        let oauth = OauthClient::new(
            http.clone(),
            config.api_base.clone(),
            config.cdn_base.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
            config.redirect_uri(),
        );
        let guild = GuildClient::new(
            http.clone(),
            config.api_base.clone(),
            config.bot_token.clone(),
            config.guild_id.clone(),
            config.verified_role_id.clone(),
        );
        let audit = config
            .audit_webhook_url
            .clone()
            .map(|url| AuditWebhook::new(http, url));

        Server {
            state: Arc::new(SharedState {
                store: GrantStore::new(),
                oauth,
                guild,
                audit,
                pending: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Handle to the shared state, for tests and embedding.
    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.listen_addr.clone();
        let router = web::router(Arc::clone(&self.state));
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("HTTP listener on {addr}");
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Bind, then serve on a background task. Returns the bound address and
    /// the task handle (for tests).
    pub async fn start(self) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
        let router = web::router(Arc::clone(&self.state));
        let listener = TcpListener::bind(&self.state.config.listen_addr).await?;
        let addr = listener.local_addr()?;
        tracing::info!("HTTP listener on {addr}");
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await?;
            Ok(())
        });
        Ok((addr, handle))
    }
}
