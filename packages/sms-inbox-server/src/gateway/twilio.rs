//! Twilio REST implementation of the messaging gateway.
//!
//! All calls use HTTP basic auth with the account SID and auth token.
//! Page tokens handed to clients are the provider's `next_page_uri`,
//! URL-safe base64 encoded, and are only followed when they point back at
//! this account's `Messages.json` listing.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use sms_inbox_core::{message::sort_by_date, Message, MessagePage, MessageQuery, SendRequest};

use super::{GatewayError, GatewayResult, MessagingGateway};
use crate::config::TwilioConfig;

/// Media URIs are relative to this host regardless of the API base in use.
const MEDIA_HOST: &str = "https://api.twilio.com";

// ── Wire Types ────────────────────────────────────────────────────────────────

/// Message resource as Twilio returns it.
#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    status: Option<String>,
    /// RFC 2822, e.g. `Mon, 16 Aug 2010 03:45:01 +0000`.
    #[serde(default)]
    date_created: Option<String>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    num_media: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<TwilioMessage>,
    #[serde(default)]
    next_page_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IncomingPhoneNumber {
    phone_number: String,
    #[serde(default)]
    capabilities: Capabilities,
}

#[derive(Debug, Default, Deserialize)]
struct Capabilities {
    #[serde(default)]
    sms: bool,
}

#[derive(Debug, Deserialize)]
struct IncomingPhoneNumberList {
    #[serde(default)]
    incoming_phone_numbers: Vec<IncomingPhoneNumber>,
    #[serde(default)]
    next_page_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaItem {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct MediaList {
    #[serde(default)]
    media_list: Vec<MediaItem>,
}

/// Error body Twilio sends with 4xx/5xx responses.
#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    message: Option<String>,
}

// ── Mapping ───────────────────────────────────────────────────────────────────

fn parse_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

fn map_message(m: TwilioMessage) -> Message {
    let num_media = m.num_media.unwrap_or_else(|| "0".to_string());
    let has_media = num_media.trim().parse::<u32>().unwrap_or(0) > 0;
    Message {
        date: parse_date(m.date_created.as_deref()),
        sid: m.sid,
        from: m.from.unwrap_or_default(),
        to: m.to.unwrap_or_default(),
        body: m.body.unwrap_or_default(),
        status: m.status.unwrap_or_default(),
        direction: m.direction.unwrap_or_default(),
        num_media,
        has_media,
    }
}

fn into_page(list: MessageList) -> MessagePage {
    let mut messages: Vec<Message> = list.messages.into_iter().map(map_message).collect();
    sort_by_date(&mut messages);
    MessagePage {
        messages,
        next_page_token: list
            .next_page_uri
            .filter(|uri| !uri.is_empty())
            .map(|uri| encode_cursor(&uri)),
    }
}

fn media_url(uri: &str) -> String {
    format!("{}{}", MEDIA_HOST, uri.strip_suffix(".json").unwrap_or(uri))
}

/// Opaque page token for a provider `next_page_uri`.
pub fn encode_cursor(next_page_uri: &str) -> String {
    URL_SAFE_NO_PAD.encode(next_page_uri.as_bytes())
}

/// Provider path for a page token, accepted only under `messages_path`.
pub fn decode_cursor(token: &str, messages_path: &str) -> GatewayResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| GatewayError::InvalidCursor)?;
    let uri = String::from_utf8(bytes).map_err(|_| GatewayError::InvalidCursor)?;

    let path = uri.split('?').next().unwrap_or_default();
    if path != messages_path {
        tracing::warn!(path, "Rejected page token for a foreign listing");
        return Err(GatewayError::InvalidCursor);
    }
    Ok(uri)
}

fn provider_error(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<TwilioErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Messaging provider error")
                .to_string()
        });
    GatewayError::Provider {
        status: status.as_u16(),
        message,
    }
}

// ── Gateway ───────────────────────────────────────────────────────────────────

/// Twilio-backed [`MessagingGateway`].
pub struct TwilioGateway {
    client: Client,
    config: TwilioConfig,
}

impl TwilioGateway {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> GatewayResult<T> {
        let resp = self.authed(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Twilio request failed: {}", body);
            return Err(provider_error(status, &body));
        }
        resp.json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> GatewayResult<T> {
        self.send_json(self.client.get(url)).await
    }

    fn message_url(&self, sid: &str, suffix: &str) -> String {
        self.config.api_url(&format!(
            "{}/Messages/{}{}",
            self.config.account_path(),
            urlencoding::encode(sid),
            suffix
        ))
    }
}

#[async_trait]
impl MessagingGateway for TwilioGateway {
    async fn list_messages(
        &self,
        query: &MessageQuery,
        page_size: u32,
    ) -> GatewayResult<MessagePage> {
        let messages_path = self.config.messages_path();

        let url = match query.page_token.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(token) => self.config.api_url(&decode_cursor(token, &messages_path)?),
            None => {
                let mut params = vec![format!("PageSize={}", page_size)];
                if let Some(from) = query.from_filter() {
                    params.push(format!("From={}", urlencoding::encode(from)));
                }
                if let Some(to) = query.to_filter() {
                    params.push(format!("To={}", urlencoding::encode(to)));
                }
                format!("{}?{}", self.config.api_url(&messages_path), params.join("&"))
            }
        };

        let list: MessageList = self.get_json(&url).await?;
        let page = into_page(list);
        tracing::debug!(
            count = page.messages.len(),
            has_more = page.next_page_token.is_some(),
            "Fetched message page"
        );
        Ok(page)
    }

    async fn fetch_message(&self, sid: &str) -> GatewayResult<Message> {
        let message: TwilioMessage = self.get_json(&self.message_url(sid, ".json")).await?;
        Ok(map_message(message))
    }

    async fn list_sms_numbers(&self) -> GatewayResult<Vec<String>> {
        let mut next = Some(self.config.api_url(&format!(
            "{}/IncomingPhoneNumbers.json?PageSize=1000",
            self.config.account_path()
        )));
        let mut numbers = Vec::new();
        while let Some(url) = next.take() {
            let mut list: IncomingPhoneNumberList = self.get_json(&url).await?;
            next = list
                .next_page_uri
                .take()
                .map(|uri| self.config.api_url(&uri));
            numbers.extend(sms_capable(list));
        }
        Ok(numbers)
    }

    async fn send_message(&self, request: &SendRequest) -> GatewayResult<String> {
        let url = self.config.api_url(&self.config.messages_path());
        let form = [
            ("From", request.from.as_str()),
            ("To", request.to.as_str()),
            ("Body", request.body.as_str()),
        ];
        let message: TwilioMessage = self.send_json(self.client.post(&url).form(&form)).await?;
        tracing::info!(sid = message.sid.as_str(), "Message queued");
        Ok(message.sid)
    }

    async fn list_media(&self, message_sid: &str) -> GatewayResult<Vec<String>> {
        let list: MediaList = self
            .get_json(&self.message_url(message_sid, "/Media.json"))
            .await?;
        Ok(list.media_list.iter().map(|m| media_url(&m.uri)).collect())
    }

    async fn get_or_create_document(&self) -> GatewayResult<serde_json::Value> {
        let service = self
            .config
            .sync_service_sid
            .as_deref()
            .ok_or(GatewayError::NotConfigured("TWILIO_SYNC_SERVICE_SID"))?;
        let name = self.config.sync_document.as_str();

        let url = self.config.sync_documents_url(service, Some(name));
        match self.get_json::<serde_json::Value>(&url).await {
            Err(GatewayError::Provider { status: 404, .. }) => {
                tracing::info!(document = name, "Sync document missing, creating it");
                let form = [("UniqueName", name), ("Data", "{}")];
                let create = self
                    .client
                    .post(self.config.sync_documents_url(service, None))
                    .form(&form);
                self.send_json(create).await
            }
            other => other,
        }
    }
}

fn sms_capable(list: IncomingPhoneNumberList) -> Vec<String> {
    list.incoming_phone_numbers
        .into_iter()
        .filter(|n| n.capabilities.sms)
        .map(|n| n.phone_number)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

    fn message_list() -> MessageList {
        serde_json::from_str(
            r#"{
                "messages": [
                    {
                        "sid": "SM2", "from": "+15550002222", "to": "+15550001111",
                        "body": "second", "status": "received", "direction": "inbound",
                        "date_created": "Tue, 03 Jun 2025 10:00:00 +0000", "num_media": "1"
                    },
                    {
                        "sid": "SM1", "from": "+15550001111", "to": "+15550002222",
                        "body": "first", "status": "delivered", "direction": "outbound-api",
                        "date_created": "Mon, 02 Jun 2025 10:00:00 +0000", "num_media": "0"
                    }
                ],
                "next_page_uri": "/2010-04-01/Accounts/AC123/Messages.json?To=%2B15550001111&PageSize=10&Page=1&PageToken=PASM1"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_page_sorted_ascending_with_media_flag() {
        let page = into_page(message_list());
        let sids: Vec<&str> = page.messages.iter().map(|m| m.sid.as_str()).collect();
        assert_eq!(sids, vec!["SM1", "SM2"]);

        let second = &page.messages[1];
        assert!(second.has_media);
        assert_eq!(second.num_media, "1");
        assert_eq!(
            second.date.unwrap().to_rfc3339(),
            "2025-06-03T10:00:00+00:00"
        );
        assert!(!page.messages[0].has_media);
    }

    #[test]
    fn test_cursor_follows_own_listing_only() {
        let page = into_page(message_list());
        let token = page.next_page_token.unwrap();
        let uri = decode_cursor(&token, MESSAGES_PATH).unwrap();
        assert!(uri.ends_with("PageToken=PASM1"));

        let foreign = encode_cursor("/2010-04-01/Accounts/AC999/Messages.json?Page=1");
        assert!(matches!(
            decode_cursor(&foreign, MESSAGES_PATH),
            Err(GatewayError::InvalidCursor)
        ));
        assert!(matches!(
            decode_cursor("not base64!", MESSAGES_PATH),
            Err(GatewayError::InvalidCursor)
        ));
    }

    #[test]
    fn test_last_page_has_no_token() {
        let list: MessageList =
            serde_json::from_str(r#"{"messages": [], "next_page_uri": null}"#).unwrap();
        assert_eq!(into_page(list).next_page_token, None);
    }

    #[test]
    fn test_media_url_drops_json_suffix() {
        assert_eq!(
            media_url("/2010-04-01/Accounts/AC123/Messages/MM1/Media/ME1.json"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages/MM1/Media/ME1"
        );
    }

    #[test]
    fn test_only_sms_capable_numbers() {
        let list: IncomingPhoneNumberList = serde_json::from_str(
            r#"{"incoming_phone_numbers": [
                {"phone_number": "+15550001111", "capabilities": {"sms": true, "voice": true}},
                {"phone_number": "+15550003333", "capabilities": {"sms": false, "voice": true}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(sms_capable(list), vec!["+15550001111".to_string()]);
    }

    #[tokio::test]
    async fn test_numbers_follow_next_page() {
        use axum::{extract::Query, routing::get, Json, Router};
        use std::collections::HashMap;

        async fn numbers(Query(query): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
            match query.get("PageToken").map(String::as_str) {
                None => Json(serde_json::json!({
                    "incoming_phone_numbers": [
                        {"phone_number": "+15550001111", "capabilities": {"sms": true}},
                        {"phone_number": "+15550002222", "capabilities": {"sms": false}}
                    ],
                    "next_page_uri": "/2010-04-01/Accounts/AC123/IncomingPhoneNumbers.json?PageSize=1000&Page=1&PageToken=PN2"
                })),
                Some(_) => Json(serde_json::json!({
                    "incoming_phone_numbers": [
                        {"phone_number": "+15550003333", "capabilities": {"sms": true}}
                    ],
                    "next_page_uri": null
                })),
            }
        }

        let app = Router::new().route(
            "/2010-04-01/Accounts/AC123/IncomingPhoneNumbers.json",
            get(numbers),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let mut config = TwilioConfig::new("AC123".to_string(), "token".to_string());
        config.api_base_url = format!("http://{}", addr);
        let gateway = TwilioGateway::new(config);

        assert_eq!(
            gateway.list_sms_numbers().await.unwrap(),
            vec!["+15550001111".to_string(), "+15550003333".to_string()]
        );
    }

    #[test]
    fn test_provider_error_message() {
        let err = provider_error(
            StatusCode::BAD_REQUEST,
            r#"{"code": 21211, "message": "The 'To' number is not a valid phone number.", "status": 400}"#,
        );
        assert!(matches!(
            err,
            GatewayError::Provider { status: 400, ref message }
                if message == "The 'To' number is not a valid phone number."
        ));

        let raw = provider_error(StatusCode::BAD_GATEWAY, "upstream unavailable");
        assert_eq!(raw.to_string(), "upstream unavailable");

        let empty = provider_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(empty.to_string(), "Service Unavailable");
    }
}
