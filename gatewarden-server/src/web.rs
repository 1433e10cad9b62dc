//! HTTP front door.
//!
//! Routes:
//!   GET  /verify/start     → mint a state token, redirect to the provider
//!   GET  /verify/callback  → one-time code arrives here; runs the session
//!   GET  /api/v1/health    → liveness probe
//!   POST /api/v1/pull      → operator-gated batch admission
//!
//! The pages rendered here are deliberately minimal: gatewarden's UI is the
//! provider's consent screen plus one result page.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::admission::{self, AdmissionSummary};
use crate::server::SharedState;
use crate::session;

/// Scopes requested from the provider: profile + email for the audit trail,
/// guilds.join for the later pull.
const OAUTH_SCOPES: &str = "identify email guilds.join";

/// How long a minted state token stays valid.
const STATE_TTL: Duration = Duration::from_secs(300);

/// Display cap for the pull response message. The JSON summary always
/// carries the complete error list.
const MAX_DISPLAYED_ERRORS: usize = 10;

/// Build the axum router.
pub fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/verify/start", get(verify_start))
        .route("/verify/callback", get(verify_callback))
        .route("/api/v1/health", get(api_health))
        .route("/api/v1/pull", post(api_pull))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn api_health() -> &'static str {
    "ok"
}

// ── Verification flow ──────────────────────────────────────────────────

async fn verify_start(State(state): State<Arc<SharedState>>) -> Redirect {
    let token = hex::encode(rand::random::<[u8; 16]>());
    {
        let mut pending = state.pending.lock();
        // Opportunistic sweep so abandoned flows cannot grow the map.
        pending.retain(|_, created| created.elapsed() < STATE_TTL);
        pending.insert(token.clone(), Instant::now());
    }

    let url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        state.config.authorize_url,
        url_encode(&state.config.client_id),
        url_encode(&state.config.redirect_uri()),
        url_encode(OAUTH_SCOPES),
        token,
    );
    Redirect::temporary(&url)
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn verify_callback(
    Query(q): Query<CallbackQuery>,
    State(state): State<Arc<SharedState>>,
) -> Response {
    // The provider reports a declined consent screen as ?error=...
    if let Some(err) = q.error {
        tracing::info!(error = %err, "authorization declined at the provider");
        return error_page("Authorization was declined. Nothing was changed.");
    }
    let (Some(code), Some(token)) = (q.code, q.state) else {
        return error_page("Malformed callback from the provider.");
    };

    // Consume the state token; unknown or stale tokens are rejected before
    // the code is spent on an exchange.
    let fresh = state
        .pending
        .lock()
        .remove(&token)
        .map(|created| created.elapsed() < STATE_TTL)
        .unwrap_or(false);
    if !fresh {
        return error_page("This verification link expired. Please start over.");
    }

    match session::verify(&state, &code).await {
        Ok(summary) => success_page(&summary.display_name, &summary.avatar_url),
        Err(e) => {
            tracing::error!(error = %e, "verification failed");
            error_page(e.user_message())
        }
    }
}

// ── Operator endpoint ──────────────────────────────────────────────────

#[derive(Serialize)]
struct PullResponse {
    #[serde(flatten)]
    summary: AdmissionSummary,
    message: String,
}

async fn api_pull(
    State(state): State<Arc<SharedState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<PullResponse>, (StatusCode, String)> {
    let expected = state.config.operator_token.clone().ok_or((
        StatusCode::FORBIDDEN,
        "Pull is not configured".to_string(),
    ))?;
    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    if presented != expected {
        return Err((StatusCode::UNAUTHORIZED, "Bad operator token".to_string()));
    }

    let summary = admission::run(&state).await;
    let message = summary.render(MAX_DISPLAYED_ERRORS);
    Ok(Json(PullResponse { summary, message }))
}

// ── Pages ──────────────────────────────────────────────────────────────

fn success_page(display_name: &str, avatar_url: &str) -> Response {
    // Both values come from the provider profile and may carry markup.
    let display_name = html_escape(display_name);
    let avatar_url = html_escape(avatar_url);
    let html = format!(
        r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>gatewarden</title>
<style>
body {{ font-family: system-ui; max-width: 460px; margin: 60px auto; padding: 0 20px; background: #12121c; color: #e4e4ee; }}
.card {{ background: #1d1d2c; border-radius: 14px; padding: 32px; text-align: center; }}
h1 {{ color: #4ade80; font-size: 22px; margin-bottom: 4px; }}
img {{ width: 72px; height: 72px; border-radius: 36px; margin: 12px 0; }}
p {{ color: #9a9ab0; }}
</style></head><body>
<div class="card">
<h1>✓ Verified</h1>
<img src="{avatar_url}" alt="">
<p>Welcome, <b>{display_name}</b>. Your role has been requested and you can close this window.</p>
</div>
</body></html>"#,
    );
    Html(html).into_response()
}

fn error_page(msg: &str) -> Response {
    let html = format!(
        r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>gatewarden</title>
<style>
body {{ font-family: system-ui; max-width: 460px; margin: 80px auto; text-align: center; background: #12121c; color: #e4e4ee; }}
h1 {{ color: #f87171; font-size: 22px; }}
p {{ color: #9a9ab0; }}
</style></head><body>
<h1>Verification failed</h1>
<p>{msg}</p>
</body></html>"#,
    );
    Html(html).into_response()
}

fn url_encode(s: &str) -> String {
    use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

/// Escape for text and attribute positions in the result pages.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encode_escapes_uri_delimiters() {
        assert_eq!(
            url_encode("http://127.0.0.1:1/cb"),
            "http%3A%2F%2F127%2E0%2E0%2E1%3A1%2Fcb"
        );
        assert_eq!(url_encode("identify email"), "identify%20email");
    }

    #[test]
    fn html_escape_neutralizes_markup() {
        assert_eq!(html_escape(r#"<b>&"'"#), "&lt;b&gt;&amp;&quot;&#39;");
        assert_eq!(html_escape("Rook"), "Rook");
    }

    #[tokio::test]
    async fn success_page_escapes_profile_values() {
        let resp = success_page("<img src=x>", "\"><u>");
        let body = axum::body::to_bytes(resp.into_body(), 1 << 16).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();

        assert!(!html.contains("<img src=x>"), "raw name markup leaked");
        assert!(html.contains("&lt;img src=x&gt;"));
        assert!(!html.contains("\"><u>"), "avatar URL broke out of its attribute");
    }
}
