//! `/api/*` routes.
//!
//! Every handler takes [`AuthenticatedUser`] first, so a missing session is
//! rejected with 401 before any parameter is looked at. Each call is a
//! single pass-through to the gateway; nothing is retried.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use sms_inbox_core::{MeResponse, Message, MessagePage, MessageQuery, SendRequest, SendResponse};

use crate::error::{ApiError, ApiResult};
use crate::session::AuthenticatedUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/messages", get(list_messages).post(send_message))
        .route("/messages/:sid", get(get_message))
        .route("/phone-numbers", get(phone_numbers))
        .route("/media/:message_sid", get(media))
        .route("/sync-document", get(sync_document))
}

async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<MeResponse> {
    Json(MeResponse { user })
}

async fn list_messages(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> ApiResult<Json<MessagePage>> {
    if !query.has_filter() {
        return Err(ApiError::BadRequest(
            "Missing required query parameter: from or to".to_string(),
        ));
    }
    let page_size = state.config.page_size_for(query.page_size);
    let page = state.gateway.list_messages(&query, page_size).await?;
    Ok(Json(page))
}

async fn get_message(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> ApiResult<Json<Message>> {
    Ok(Json(state.gateway.fetch_message(&sid).await?))
}

async fn send_message(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> ApiResult<Json<SendResponse>> {
    if [&request.from, &request.to, &request.body]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(ApiError::BadRequest(
            "from, to and body are required".to_string(),
        ));
    }
    let sid = state.gateway.send_message(&request).await?;
    tracing::info!(user = user.id.as_str(), sid = sid.as_str(), "Message sent");
    Ok(Json(SendResponse { sid }))
}

async fn phone_numbers(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.gateway.list_sms_numbers().await?))
}

async fn media(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(message_sid): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.gateway.list_media(&message_sid).await?))
}

async fn sync_document(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(state.gateway.get_or_create_document().await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::{body_json, get, post_json, sign_in, test_app, ACCOUNT, CONTACT};

    #[tokio::test]
    async fn test_api_requires_session() {
        let (app, _) = test_app();
        for uri in [
            "/twilio-sms-web/api/me",
            "/twilio-sms-web/api/messages?from=%2B15550001111",
            "/twilio-sms-web/api/messages",
            "/twilio-sms-web/api/phone-numbers",
            "/twilio-sms-web/api/media/SM1",
            "/twilio-sms-web/api/sync-document",
        ] {
            let resp = get(&app, uri, None).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body_json(resp).await, json!({"error": "unauthenticated"}));
        }

        let forged = get(
            &app,
            "/twilio-sms-web/api/me",
            Some("sms_inbox_session=abc.0000"),
        )
        .await;
        assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_returns_principal() {
        let (app, _) = test_app();
        let cookie = sign_in(&app).await;
        let resp = get(&app, "/twilio-sms-web/api/me", Some(&cookie)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["user"]["id"], "user-1");
        assert_eq!(body["user"]["profile"]["name"], "Ada Lovelace");
        assert_eq!(body["user"]["idToken"], "id-token-1");
    }

    #[tokio::test]
    async fn test_messages_require_a_filter() {
        let (app, _) = test_app();
        let cookie = sign_in(&app).await;

        for uri in [
            "/twilio-sms-web/api/messages",
            "/twilio-sms-web/api/messages?from=&to=%20",
        ] {
            let resp = get(&app, uri, Some(&cookie)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body_json(resp).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_messages_with_either_filter() {
        let (app, _) = test_app();
        let cookie = sign_in(&app).await;

        let resp = get(
            &app,
            "/twilio-sms-web/api/messages?from=%2B15550001111",
            Some(&cookie),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["nextPageToken"], serde_json::Value::Null);

        let resp = get(
            &app,
            "/twilio-sms-web/api/messages?to=%2B15550001111&pageSize=5",
            Some(&cookie),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["messages"][0]["sid"], "SM2");
        assert_eq!(body["messages"][0]["direction"], "inbound");
    }

    #[tokio::test]
    async fn test_invalid_page_token_is_bad_request() {
        let (app, _) = test_app();
        let cookie = sign_in(&app).await;
        let resp = get(
            &app,
            "/twilio-sms-web/api/messages?from=%2B15550001111&pageToken=bogus",
            Some(&cookie),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_single_message() {
        let (app, _) = test_app();
        let cookie = sign_in(&app).await;

        let resp = get(&app, "/twilio-sms-web/api/messages/SM1", Some(&cookie)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["sid"], "SM1");

        let missing = get(&app, "/twilio-sms-web/api/messages/SM404", Some(&cookie)).await;
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(missing).await["error"],
            "The requested resource SM404 was not found"
        );
    }

    #[tokio::test]
    async fn test_send_message() {
        let (app, gateway) = test_app();
        let cookie = sign_in(&app).await;

        let resp = post_json(
            &app,
            "/twilio-sms-web/api/messages",
            Some(&cookie),
            json!({"from": ACCOUNT, "to": CONTACT, "body": "hello"}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({"sid": "SM-sent-1"}));
        assert_eq!(gateway.sent.lock().unwrap().len(), 1);

        let blank = post_json(
            &app,
            "/twilio-sms-web/api/messages",
            Some(&cookie),
            json!({"from": ACCOUNT, "to": CONTACT, "body": "  "}),
        )
        .await;
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_provider_failure_passes_message_through() {
        let (app, _) = test_app();
        let cookie = sign_in(&app).await;
        let resp = post_json(
            &app,
            "/twilio-sms-web/api/messages",
            Some(&cookie),
            json!({"from": ACCOUNT, "to": "+15559999999", "body": "hello"}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(resp).await,
            json!({"error": "The 'To' number is not a valid phone number."})
        );
    }

    #[tokio::test]
    async fn test_numbers_media_and_document() {
        let (app, _) = test_app();
        let cookie = sign_in(&app).await;

        let numbers = get(&app, "/twilio-sms-web/api/phone-numbers", Some(&cookie)).await;
        assert_eq!(body_json(numbers).await, json!([ACCOUNT]));

        let media = get(&app, "/twilio-sms-web/api/media/MM1", Some(&cookie)).await;
        let urls = body_json(media).await;
        assert!(urls[0].as_str().unwrap().ends_with("/Messages/MM1/Media/ME1"));

        let doc = get(&app, "/twilio-sms-web/api/sync-document", Some(&cookie)).await;
        assert_eq!(body_json(doc).await["unique_name"], "twilio_sms_web");
    }

    #[tokio::test]
    async fn test_ping_outside_base_path() {
        let (app, _) = test_app();
        let resp = get(&app, "/ping", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({"ok": true}));
    }
}
