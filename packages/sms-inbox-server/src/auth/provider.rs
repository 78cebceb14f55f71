//! OpenID Connect identity provider adapter.
//!
//! Authorization-code flow against a Keycloak realm: build the
//! authorization redirect, exchange the returned code for tokens, check the
//! ID token claims, and read the userinfo profile.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sms_inbox_core::Principal;
use thiserror::Error;

use crate::config::{OidcConfig, OIDC_SCOPES};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to reach the identity provider: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Token exchange failed: {status} - {body}")]
    Exchange { status: u16, body: String },

    #[error("Token response did not include an ID token")]
    MissingIdToken,

    #[error("Invalid ID token: {0}")]
    InvalidIdToken(String),

    #[error("Userinfo request failed: {0}")]
    Userinfo(String),
}

/// The identity provider as seen by the auth routes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start a login.
    fn authorization_url(&self, state: &str, nonce: &str) -> String;

    /// Exchange an authorization code for the signed-in principal.
    async fn exchange_code(&self, code: &str, nonce: &str) -> Result<Principal, AuthError>;

    /// Provider end-session URL, returning the browser to `redirect_uri`.
    fn end_session_url(&self, redirect_uri: &str, id_token_hint: Option<&str>) -> String;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
}

/// `aud` may be a single string or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::One(aud) => aud == client_id,
            Audience::Many(auds) => auds.iter().any(|a| a == client_id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    iss: String,
    sub: String,
    aud: Audience,
    exp: i64,
    #[serde(default)]
    nonce: Option<String>,
}

/// Decode the claims segment of a compact JWT.
///
/// The token comes straight from the token endpoint over TLS, so the
/// signature is not re-verified here.
fn decode_claims(id_token: &str) -> Result<IdTokenClaims, AuthError> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidIdToken("malformed token".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::InvalidIdToken(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidIdToken(e.to_string()))
}

fn check_claims(
    claims: &IdTokenClaims,
    config: &OidcConfig,
    nonce: &str,
    now: i64,
) -> Result<(), AuthError> {
    if claims.iss != config.issuer() {
        return Err(AuthError::InvalidIdToken(format!("unexpected issuer {}", claims.iss)));
    }
    if !claims.aud.contains(&config.client_id) {
        return Err(AuthError::InvalidIdToken("audience mismatch".to_string()));
    }
    if claims.exp <= now {
        return Err(AuthError::InvalidIdToken("token expired".to_string()));
    }
    if claims.nonce.as_deref() != Some(nonce) {
        return Err(AuthError::InvalidIdToken("nonce mismatch".to_string()));
    }
    Ok(())
}

/// Keycloak realm client.
pub struct KeycloakProvider {
    config: OidcConfig,
    client: Client,
}

impl KeycloakProvider {
    pub fn new(config: OidcConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl IdentityProvider for KeycloakProvider {
    fn authorization_url(&self, state: &str, nonce: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&nonce={}",
            self.config.auth_url(),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            OIDC_SCOPES.join("%20"),
            state,
            nonce
        )
    }

    async fn exchange_code(&self, code: &str, nonce: &str) -> Result<Principal, AuthError> {
        let resp = self
            .client
            .post(self.config.token_url())
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Exchange { status, body });
        }
        let token: TokenResponse = resp.json().await?;

        let id_token = token.id_token.ok_or(AuthError::MissingIdToken)?;
        let claims = decode_claims(&id_token)?;
        check_claims(&claims, &self.config, nonce, Utc::now().timestamp())?;

        let resp = self
            .client
            .get(self.config.userinfo_url())
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AuthError::Userinfo(format!("status {}", resp.status())));
        }
        let profile: serde_json::Value = resp.json().await?;

        if profile.get("sub").and_then(|s| s.as_str()) != Some(claims.sub.as_str()) {
            return Err(AuthError::Userinfo("subject mismatch".to_string()));
        }

        tracing::info!(sub = claims.sub.as_str(), "User authenticated");

        Ok(Principal {
            id: claims.sub,
            profile,
            id_token: Some(id_token),
        })
    }

    fn end_session_url(&self, redirect_uri: &str, id_token_hint: Option<&str>) -> String {
        let mut url = format!(
            "{}?redirect_uri={}",
            self.config.logout_url(),
            urlencoding::encode(redirect_uri)
        );
        if let Some(hint) = id_token_hint {
            url.push_str("&id_token_hint=");
            url.push_str(&urlencoding::encode(hint));
        }
        url
    }
}
