//! In-memory gateway and identity provider for router tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use sms_inbox_core::{Message, MessagePage, MessageQuery, Principal, SendRequest};
use tower::ServiceExt;

use crate::auth::{AuthError, IdentityProvider};
use crate::config::ServerConfig;
use crate::gateway::{GatewayError, GatewayResult, MessagingGateway};
use crate::state::AppState;

pub const ACCOUNT: &str = "+15550001111";
pub const CONTACT: &str = "+15550002222";

/// Code the fake provider accepts.
pub const GOOD_CODE: &str = "good-code";

fn message(sid: &str, from: &str, to: &str, minute: u32) -> Message {
    Message {
        sid: sid.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        body: format!("body of {}", sid),
        status: "delivered".to_string(),
        date: Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).single(),
        direction: if from == ACCOUNT { "outbound-api" } else { "inbound" }.to_string(),
        num_media: "0".to_string(),
        has_media: false,
    }
}

#[derive(Default)]
pub struct FakeGateway {
    pub sent: Mutex<Vec<SendRequest>>,
}

impl FakeGateway {
    fn messages() -> Vec<Message> {
        vec![
            message("SM1", ACCOUNT, CONTACT, 0),
            message("SM2", CONTACT, ACCOUNT, 1),
            message("SM3", ACCOUNT, "+15550003333", 2),
        ]
    }
}

#[async_trait]
impl MessagingGateway for FakeGateway {
    async fn list_messages(
        &self,
        query: &MessageQuery,
        page_size: u32,
    ) -> GatewayResult<MessagePage> {
        if query.page_token.as_deref() == Some("bogus") {
            return Err(GatewayError::InvalidCursor);
        }
        let messages = Self::messages()
            .into_iter()
            .filter(|m| query.from_filter().map_or(true, |f| m.from == f))
            .filter(|m| query.to_filter().map_or(true, |t| m.to == t))
            .take(page_size as usize)
            .collect();
        Ok(MessagePage {
            messages,
            next_page_token: None,
        })
    }

    async fn fetch_message(&self, sid: &str) -> GatewayResult<Message> {
        Self::messages()
            .into_iter()
            .find(|m| m.sid == sid)
            .ok_or_else(|| GatewayError::Provider {
                status: 404,
                message: format!("The requested resource {} was not found", sid),
            })
    }

    async fn list_sms_numbers(&self) -> GatewayResult<Vec<String>> {
        Ok(vec![ACCOUNT.to_string()])
    }

    async fn send_message(&self, request: &SendRequest) -> GatewayResult<String> {
        if request.to == "+15559999999" {
            return Err(GatewayError::Provider {
                status: 400,
                message: "The 'To' number is not a valid phone number.".to_string(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(request.clone());
        Ok(format!("SM-sent-{}", sent.len()))
    }

    async fn list_media(&self, message_sid: &str) -> GatewayResult<Vec<String>> {
        Ok(vec![format!(
            "https://api.twilio.com/2010-04-01/Accounts/AC1/Messages/{}/Media/ME1",
            message_sid
        )])
    }

    async fn get_or_create_document(&self) -> GatewayResult<serde_json::Value> {
        Ok(json!({"unique_name": "twilio_sms_web", "data": {}}))
    }
}

pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn authorization_url(&self, state: &str, nonce: &str) -> String {
        format!("https://idp.test/auth?state={}&nonce={}", state, nonce)
    }

    async fn exchange_code(&self, code: &str, _nonce: &str) -> Result<Principal, AuthError> {
        if code != GOOD_CODE {
            return Err(AuthError::Exchange {
                status: 400,
                body: "invalid_grant".to_string(),
            });
        }
        Ok(Principal {
            id: "user-1".to_string(),
            profile: json!({"sub": "user-1", "name": "Ada Lovelace"}),
            id_token: Some("id-token-1".to_string()),
        })
    }

    fn end_session_url(&self, redirect_uri: &str, id_token_hint: Option<&str>) -> String {
        format!(
            "https://idp.test/logout?redirect_uri={}&id_token_hint={}",
            redirect_uri,
            id_token_hint.unwrap_or("")
        )
    }
}

pub fn test_state() -> (AppState, Arc<FakeGateway>) {
    let gateway = Arc::new(FakeGateway::default());
    let state = AppState::new(
        ServerConfig::default(),
        "test-secret",
        gateway.clone(),
        Arc::new(FakeIdentity),
    );
    (state, gateway)
}

pub fn test_app() -> (Router, Arc<FakeGateway>) {
    let (state, gateway) = test_state();
    (crate::build_router(state), gateway)
}

// ── Request Helpers ───────────────────────────────────────────────────────────

pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    cookie: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `name=value` part of the response's `Set-Cookie` header.
pub fn cookie_of(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap_or_default()
        .to_string()
}

pub fn location_of(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Run the whole login flow and return the signed-in cookie.
pub async fn sign_in(app: &Router) -> String {
    let login = get(app, "/twilio-sms-web/auth/login", None).await;
    let cookie = cookie_of(&login);
    let location = location_of(&login);
    let state = location
        .split("state=")
        .nth(1)
        .and_then(|rest| rest.split('&').next())
        .unwrap_or_default()
        .to_string();

    let callback = get(
        app,
        &format!("/twilio-sms-web/auth/callback?code={}&state={}", GOOD_CODE, state),
        Some(&cookie),
    )
    .await;
    cookie_of(&callback)
}
