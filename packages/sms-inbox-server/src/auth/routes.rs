//! `/auth/*` routes: login redirect, provider callback, failure page, logout.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::session::{expired_cookie, session_cookie, set_cookie};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/failure", get(failure))
        .route("/logout", get(logout))
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn with_cookie(mut response: Response, value: axum::http::HeaderValue) -> Response {
    set_cookie(response.headers_mut(), value);
    response
}

/// Start the authorization-code flow.
async fn login(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let existing = state.sessions.id_from_headers(&headers);
    let (id, pending) = state.sessions.begin_login(existing.as_deref());

    let url = state.identity.authorization_url(&pending.state, &pending.nonce);
    let cookie = session_cookie(&state.sessions.sign(&id), state.config.secure_cookies);
    with_cookie(Redirect::to(&url).into_response(), cookie)
}

/// Finish the flow: verify state, exchange the code, rotate the session.
async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let failure = Redirect::to(&state.config.failure_path()).into_response();

    if let Some(error) = &query.error {
        tracing::warn!(
            error = error.as_str(),
            description = query.error_description.as_deref().unwrap_or(""),
            "Identity provider returned an error"
        );
        return failure;
    }

    let (Some(code), Some(returned_state)) = (&query.code, &query.state) else {
        tracing::warn!("Callback without code or state");
        return failure;
    };

    let Some(session_id) = state.sessions.id_from_headers(&headers) else {
        tracing::warn!("Callback without a session cookie");
        return failure;
    };

    let Some(pending) = state.sessions.take_pending(&session_id, returned_state) else {
        return failure;
    };

    let principal = match state.identity.exchange_code(code, &pending.nonce).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Login failed: {}", e);
            return failure;
        }
    };

    let new_id = state.sessions.complete_login(&session_id, principal);
    let cookie = session_cookie(&state.sessions.sign(&new_id), state.config.secure_cookies);
    with_cookie(Redirect::to(&state.config.inbox_url()).into_response(), cookie)
}

async fn failure() -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, "Authentication failed")
}

/// Drop the session and end the provider session too.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let id_token = state
        .sessions
        .id_from_headers(&headers)
        .and_then(|id| state.sessions.destroy(&id))
        .and_then(|session| session.principal)
        .and_then(|principal| {
            tracing::info!(user = principal.id.as_str(), "User logged out");
            principal.id_token
        });

    let url = state
        .identity
        .end_session_url(&state.config.login_url(), id_token.as_deref());
    with_cookie(
        Redirect::to(&url).into_response(),
        expired_cookie(state.config.secure_cookies),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testing::{body_text, cookie_of, get, location_of, sign_in, test_app};

    #[tokio::test]
    async fn test_login_redirects_with_session_cookie() {
        let (app, _) = test_app();
        let resp = get(&app, "/twilio-sms-web/auth/login", None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(location_of(&resp).starts_with("https://idp.test/auth?state="));
        assert!(cookie_of(&resp).starts_with("sms_inbox_session="));
    }

    #[tokio::test]
    async fn test_callback_success_lands_on_inbox_with_new_session() {
        let (app, _) = test_app();
        let login = get(&app, "/twilio-sms-web/auth/login", None).await;
        let login_cookie = cookie_of(&login);
        let location = location_of(&login);
        let state = location
            .split("state=")
            .nth(1)
            .and_then(|rest| rest.split('&').next())
            .unwrap();

        let resp = get(
            &app,
            &format!("/twilio-sms-web/auth/callback?code=good-code&state={}", state),
            Some(&login_cookie),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location_of(&resp), "http://localhost:3000/#/inbox");

        let session_cookie = cookie_of(&resp);
        assert_ne!(session_cookie, login_cookie);

        // The pre-login session id is no longer valid.
        let me = get(&app, "/twilio-sms-web/api/me", Some(&login_cookie)).await;
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
        let me = get(&app, "/twilio-sms-web/api/me", Some(&session_cookie)).await;
        assert_eq!(me.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_callback_failures_redirect_to_failure_page() {
        let (app, _) = test_app();
        let login = get(&app, "/twilio-sms-web/auth/login", None).await;
        let cookie = cookie_of(&login);

        for uri in [
            "/twilio-sms-web/auth/callback?error=access_denied",
            "/twilio-sms-web/auth/callback?code=good-code",
            "/twilio-sms-web/auth/callback?code=good-code&state=forged",
        ] {
            let resp = get(&app, uri, Some(&cookie)).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", uri);
            assert_eq!(location_of(&resp), "/twilio-sms-web/auth/failure");
        }

        let failure = get(&app, "/twilio-sms-web/auth/failure", None).await;
        assert_eq!(failure.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(failure).await, "Authentication failed");
    }

    #[tokio::test]
    async fn test_bad_code_fails_login() {
        let (app, _) = test_app();
        let login = get(&app, "/twilio-sms-web/auth/login", None).await;
        let cookie = cookie_of(&login);
        let location = location_of(&login);
        let state = location
            .split("state=")
            .nth(1)
            .and_then(|rest| rest.split('&').next())
            .unwrap();

        let resp = get(
            &app,
            &format!("/twilio-sms-web/auth/callback?code=bad&state={}", state),
            Some(&cookie),
        )
        .await;
        assert_eq!(location_of(&resp), "/twilio-sms-web/auth/failure");
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (app, _) = test_app();
        let cookie = sign_in(&app).await;

        let me = get(&app, "/twilio-sms-web/api/me", Some(&cookie)).await;
        assert_eq!(me.status(), StatusCode::OK);

        let logout = get(&app, "/twilio-sms-web/auth/logout", Some(&cookie)).await;
        assert_eq!(logout.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location_of(&logout),
            "https://idp.test/logout?redirect_uri=http://localhost:3001/twilio-sms-web/auth/login&id_token_hint=id-token-1"
        );
        assert_eq!(cookie_of(&logout), "sms_inbox_session=");

        let me = get(&app, "/twilio-sms-web/api/me", Some(&cookie)).await;
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    }
}
