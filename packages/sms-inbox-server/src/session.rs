//! Server-side sessions.
//!
//! Sessions live in a concurrent map keyed by a random id. The browser only
//! holds `<id>.<hmac>` in an HttpOnly cookie; a cookie whose signature does
//! not verify is treated as absent.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sms_inbox_core::{Principal, SESSION_COOKIE};

use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// How long a login may take between redirect and callback (10 minutes).
pub const PENDING_LOGIN_TTL_SECS: i64 = 600;

/// State carried across the identity provider redirect.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    /// Anti-CSRF value echoed back on the callback.
    pub state: String,
    /// Bound into the ID token.
    pub nonce: String,
    pub created_at: DateTime<Utc>,
}

impl PendingLogin {
    fn new() -> Self {
        Self {
            state: random_token(16),
            nonce: random_token(16),
            created_at: Utc::now(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.created_at).num_seconds() > PENDING_LOGIN_TTL_SECS
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub principal: Option<Principal>,
    pub pending: Option<PendingLogin>,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    fn empty() -> Self {
        Self {
            principal: None,
            pending: None,
            last_seen: Utc::now(),
        }
    }
}

/// Concurrent session store.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    mac: HmacSha256,
    ttl_secs: i64,
}

impl SessionStore {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            mac: HmacSha256::new_from_slice(secret.as_bytes())
                .expect("HMAC accepts keys of any length"),
            ttl_secs,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    // ── Cookie Signing ────────────────────────────────────────────────────

    /// Cookie value for a session id.
    pub fn sign(&self, id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        format!("{}.{}", id, hex::encode(mac.finalize().into_bytes()))
    }

    /// Session id from a cookie value, if the signature verifies.
    pub fn verify(&self, value: &str) -> Option<String> {
        let (id, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(id.to_string())
    }

    /// Verified session id from the request's `Cookie` headers.
    pub fn id_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| self.verify(value))
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Look up a live session and refresh its idle timer.
    pub fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        let mut entry = self.sessions.get_mut(id)?;
        if self.is_expired(&entry, now) {
            drop(entry);
            self.sessions.remove(id);
            tracing::debug!("Session expired");
            return None;
        }
        entry.last_seen = now;
        Some(entry.clone())
    }

    /// The signed-in principal for a session id.
    pub fn principal(&self, id: &str) -> Option<Principal> {
        self.get(id).and_then(|s| s.principal)
    }

    /// Start a login, reusing the caller's session when it still exists.
    /// Returns the session id and the state/nonce pair to send upstream.
    pub fn begin_login(&self, existing: Option<&str>) -> (String, PendingLogin) {
        let pending = PendingLogin::new();
        let id = match existing.filter(|id| self.get(id).is_some()) {
            Some(id) => id.to_string(),
            None => {
                let id = random_token(32);
                self.sessions.insert(id.clone(), Session::empty());
                id
            }
        };
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.pending = Some(pending.clone());
        }
        tracing::debug!(pending_sessions = self.sessions.len(), "Login started");
        (id, pending)
    }

    /// Consume the pending login if `state` matches and it has not expired.
    pub fn take_pending(&self, id: &str, state: &str) -> Option<PendingLogin> {
        let mut session = self.sessions.get_mut(id)?;
        let pending = session.pending.take()?;
        if pending.state != state {
            tracing::warn!("Login state mismatch");
            return None;
        }
        if pending.is_expired(Utc::now()) {
            tracing::warn!("Login state expired");
            return None;
        }
        Some(pending)
    }

    /// Store the principal under a fresh session id and drop the old one.
    pub fn complete_login(&self, old_id: &str, principal: Principal) -> String {
        self.sessions.remove(old_id);
        let id = random_token(32);
        self.sessions.insert(
            id.clone(),
            Session {
                principal: Some(principal),
                pending: None,
                last_seen: Utc::now(),
            },
        );
        id
    }

    pub fn destroy(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, s)| s)
    }

    /// Drop idle sessions and abandoned logins.
    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| {
            if self.is_expired(session, now) {
                return false;
            }
            match (&session.principal, &session.pending) {
                (None, Some(pending)) => !pending.is_expired(now),
                (None, None) => false,
                _ => true,
            }
        });
        let removed = before.saturating_sub(self.len());
        if removed > 0 {
            tracing::info!(removed, remaining = self.len(), "Expired sessions removed");
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        (now - session.last_seen).num_seconds() > self.ttl_secs
    }
}

fn random_token(bytes: usize) -> String {
    let raw: Vec<u8> = (0..bytes).map(|_| rand::random::<u8>()).collect();
    hex::encode(raw)
}

// ── Cookies ───────────────────────────────────────────────────────────────────

/// `Set-Cookie` value carrying a signed session id.
///
/// No `Max-Age`: the cookie lasts for the browser session and the idle TTL
/// is enforced server-side by [`SessionStore::get`].
pub fn session_cookie(value: &str, secure: bool) -> HeaderValue {
    cookie_header(&format!(
        "{}={}; Path=/; HttpOnly{}",
        SESSION_COOKIE,
        value,
        cookie_attributes(secure)
    ))
}

/// `Set-Cookie` value that removes the session cookie.
pub fn expired_cookie(secure: bool) -> HeaderValue {
    cookie_header(&format!(
        "{}=; Path=/; HttpOnly; Max-Age=0{}",
        SESSION_COOKIE,
        cookie_attributes(secure)
    ))
}

fn cookie_attributes(secure: bool) -> &'static str {
    if secure {
        "; SameSite=None; Secure"
    } else {
        "; SameSite=Lax"
    }
}

fn cookie_header(value: &str) -> HeaderValue {
    // Signed ids are hex, so this only fails on a programming error.
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Append a `Set-Cookie` header.
pub fn set_cookie(headers: &mut HeaderMap, value: HeaderValue) {
    headers.append(SET_COOKIE, value);
}

// ── Extractors ────────────────────────────────────────────────────────────────

/// The current principal, if any. Never rejects.
pub struct MaybePrincipal(pub Option<Principal>);

#[async_trait]
impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = state
            .sessions
            .id_from_headers(&parts.headers)
            .and_then(|id| state.sessions.principal(&id));
        Ok(MaybePrincipal(principal))
    }
}

/// The signed-in principal; rejects with 401 `{"error": "unauthenticated"}`.
pub struct AuthenticatedUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybePrincipal(principal) = MaybePrincipal::from_request_parts(parts, state)
            .await
            .unwrap_or(MaybePrincipal(None));
        principal
            .map(AuthenticatedUser)
            .ok_or(ApiError::Unauthenticated)
    }
}
