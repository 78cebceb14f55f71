//! Shared server state.
//!
//! Cheap to clone: the session map and provider clients sit behind `Arc`s
//! and are handed to every request through axum's `State`.

use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::config::ServerConfig;
use crate::gateway::MessagingGateway;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,

    /// Session id → principal / pending login.
    pub sessions: SessionStore,

    /// SMS provider client.
    pub gateway: Arc<dyn MessagingGateway>,

    /// OpenID Connect client.
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        session_secret: &str,
        gateway: Arc<dyn MessagingGateway>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let sessions = SessionStore::new(session_secret, config.session_ttl_secs);
        Self {
            config: Arc::new(config),
            sessions,
            gateway,
            identity,
        }
    }

    /// Periodic maintenance, run from the cleanup task.
    pub fn cleanup_expired(&self) {
        self.sessions.cleanup_expired();
    }
}
