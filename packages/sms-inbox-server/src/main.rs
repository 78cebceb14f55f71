//! SMS Inbox Server
//!
//! A thin REST facade over Twilio's messaging API:
//!
//! 1. **Authentication**: OpenID Connect login against a Keycloak realm.
//!    The signed-in principal lives in a server-side session referenced by a
//!    signed cookie.
//!
//! 2. **Messaging API**: session-guarded `/api` routes that list, fetch and
//!    send messages, list the account's SMS numbers and message media, and
//!    read the app's sync document.
//!
//! The server keeps no message data of its own; every API call is a single
//! pass-through to the provider.

mod api;
mod auth;
mod config;
mod error;
mod gateway;
mod session;
mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use clap::Parser;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use auth::KeycloakProvider;
use config::{normalize_base_path, OidcConfig, ServerConfig, TwilioConfig};
use gateway::TwilioGateway;
use state::AppState;

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sms-inbox-server", version, about = "SMS inbox backend")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3001, env = "PORT")]
    port: u16,

    /// Path prefix for the auth and api routes
    #[arg(long, default_value = "/twilio-sms-web", env = "BASE_PATH")]
    base_path: String,

    /// Public URL of this server, including the base path
    #[arg(
        long,
        default_value = "http://localhost:3001/twilio-sms-web",
        env = "BACKEND_BASE_URL"
    )]
    backend_base_url: String,

    /// Public URL of the web frontend (redirect target and CORS origin)
    #[arg(long, default_value = "http://localhost:3000", env = "FRONTEND_BASE_URL")]
    frontend_base_url: String,

    /// Secret used to sign session cookies
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    session_secret: String,

    /// Idle session lifetime in seconds
    #[arg(long, default_value_t = config::DEFAULT_SESSION_TTL_SECS, env = "SESSION_TTL_SECS")]
    session_ttl_secs: i64,

    /// Cleanup interval in seconds
    #[arg(long, default_value_t = 300, env = "CLEANUP_INTERVAL_SECS")]
    cleanup_interval_secs: u64,

    /// Send cookies with `Secure; SameSite=None` (HTTPS deployments)
    #[arg(long, default_value_t = false, env = "SECURE_COOKIES")]
    secure_cookies: bool,

    /// Keycloak server root URL
    #[arg(long, env = "KEYCLOAK_BASE_URL")]
    keycloak_base_url: String,

    /// Keycloak realm name
    #[arg(long, env = "KEYCLOAK_REALM")]
    keycloak_realm: String,

    /// OpenID Connect client id
    #[arg(long, env = "KEYCLOAK_CLIENT_ID")]
    keycloak_client_id: String,

    /// OpenID Connect client secret
    #[arg(long, env = "KEYCLOAK_CLIENT_SECRET", hide_env_values = true)]
    keycloak_client_secret: String,

    /// Twilio account SID
    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    twilio_account_sid: String,

    /// Twilio auth token
    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    twilio_auth_token: String,

    /// Twilio Sync service holding the app document
    #[arg(long, env = "TWILIO_SYNC_SERVICE_SID")]
    twilio_sync_service_sid: Option<String>,

    /// Unique name of the app's sync document
    #[arg(long, default_value = "twilio_sms_web", env = "TWILIO_SYNC_DOCUMENT")]
    twilio_sync_document: String,

    /// Default number of messages per page
    #[arg(long, default_value_t = config::DEFAULT_PAGE_SIZE, env = "MESSAGE_PAGE_SIZE")]
    message_page_size: u32,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false, env = "LOG_JSON")]
    log_json: bool,
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sms_inbox_server=info,tower_http=info".into());
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = ServerConfig {
        port: args.port,
        base_path: normalize_base_path(&args.base_path),
        backend_base_url: args.backend_base_url,
        frontend_base_url: args.frontend_base_url,
        session_ttl_secs: args.session_ttl_secs,
        secure_cookies: args.secure_cookies,
        page_size: args.message_page_size,
    };

    let oidc = OidcConfig {
        base_url: args.keycloak_base_url,
        realm: args.keycloak_realm,
        client_id: args.keycloak_client_id,
        client_secret: args.keycloak_client_secret,
        redirect_uri: config.callback_url(),
    };

    let mut twilio = TwilioConfig::new(args.twilio_account_sid, args.twilio_auth_token);
    twilio.sync_service_sid = args.twilio_sync_service_sid.filter(|s| !s.trim().is_empty());
    twilio.sync_document = args.twilio_sync_document;

    if twilio.sync_service_sid.is_none() {
        tracing::warn!("TWILIO_SYNC_SERVICE_SID not set, /api/sync-document is disabled");
    }
    tracing::info!(
        issuer = oidc.issuer().as_str(),
        base_path = config.base_path.as_str(),
        "Configuration loaded"
    );

    let state = AppState::new(
        config,
        &args.session_secret,
        Arc::new(TwilioGateway::new(twilio)),
        Arc::new(KeycloakProvider::new(oidc)),
    );

    // Spawn periodic cleanup task
    let cleanup_state = state.clone();
    let cleanup_interval = args.cleanup_interval_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cleanup_interval));
        loop {
            interval.tick().await;
            cleanup_state.cleanup_expired();
        }
    });

    let addr = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state);

    tracing::info!("SMS inbox server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

// ── Router ────────────────────────────────────────────────────────────────────

/// All routes, mounted under the configured base path, plus `/ping`.
pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .nest("/auth", auth::routes::router())
        .nest("/api", api::router());

    let base_path = state.config.base_path.clone();
    let app = if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(&base_path, routes)
    };

    app.route("/ping", get(ping_handler))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the frontend origin only.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(config.frontend_origin()) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(
                origin = config.frontend_origin(),
                "Invalid frontend origin, cross-origin requests will be refused"
            );
            cors
        }
    }
}

/// Liveness check.
async fn ping_handler() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}
