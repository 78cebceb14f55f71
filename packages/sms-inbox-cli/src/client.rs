//! REST client for the inbox server (the data layer).
//!
//! One method per resource. Failures come back as [`sms_inbox_core::Error`]
//! built from the HTTP status and the server's `{"error": ...}` body.

use std::collections::HashSet;

use reqwest::{header::COOKIE, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use sms_inbox_core::{
    message::sort_by_date, Error, MeResponse, Message, MessageFilter, MessagePage, MessageQuery,
    Principal, Result, SendRequest, SendResponse, SESSION_COOKIE,
};

#[derive(Clone)]
pub struct InboxClient {
    http: Client,
    base_url: String,
    /// Signed session cookie value copied from a browser login.
    session: Option<String>,
}

impl InboxClient {
    pub fn new(base_url: &str, session: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session: session.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Browser login entry point.
    pub fn login_url(&self) -> String {
        format!("{}/auth/login", self.base_url)
    }

    pub fn logout_url(&self) -> String {
        format!("{}/auth/logout", self.base_url)
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match &self.session {
            Some(session) => request.header(COOKIE, format!("{}={}", SESSION_COOKIE, session)),
            None => request,
        };

        let resp = request
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Request failed: {}", text);
            return Err(Error::from_status(status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(|e| Error::Decode(e.to_string()))
    }

    // ── Resources ─────────────────────────────────────────────────────────

    pub async fn me(&self) -> Result<Principal> {
        let resp: MeResponse = self.fetch(self.http.get(self.url("/me"))).await?;
        Ok(resp.user)
    }

    pub async fn messages(&self, query: &MessageQuery) -> Result<MessagePage> {
        self.fetch(self.http.get(self.url("/messages")).query(query))
            .await
    }

    pub async fn message(&self, sid: &str) -> Result<Message> {
        let path = format!("/messages/{}", encode_segment(sid));
        self.fetch(self.http.get(self.url(&path))).await
    }

    pub async fn phone_numbers(&self) -> Result<Vec<String>> {
        self.fetch(self.http.get(self.url("/phone-numbers"))).await
    }

    pub async fn send(&self, request: &SendRequest) -> Result<String> {
        let resp: SendResponse = self
            .fetch(self.http.post(self.url("/messages")).json(request))
            .await?;
        Ok(resp.sid)
    }

    pub async fn media(&self, message_sid: &str) -> Result<Vec<String>> {
        let path = format!("/media/{}", encode_segment(message_sid));
        self.fetch(self.http.get(self.url(&path))).await
    }

    pub async fn sync_document(&self) -> Result<serde_json::Value> {
        self.fetch(self.http.get(self.url("/sync-document"))).await
    }

    // ── Aggregates ────────────────────────────────────────────────────────

    /// Both directions of one number's first page.
    async fn sent_and_received(&self, number: &str) -> Result<Vec<Message>> {
        let sent_query = MessageQuery::sent_by(number);
        let received_query = MessageQuery::received_by(number);
        let (sent, received) =
            tokio::join!(self.messages(&sent_query), self.messages(&received_query));
        let mut messages = sent?.messages;
        messages.extend(received?.messages);
        Ok(messages)
    }

    /// Messages for the inbox list.
    ///
    /// With a number, that number's traffic narrowed by `filter`. Without
    /// one, the first page in each direction for every account number; a
    /// number that fails is logged and skipped.
    pub async fn inbox_messages(
        &self,
        number: Option<&str>,
        filter: MessageFilter,
    ) -> Result<Vec<Message>> {
        if let Some(number) = number {
            let messages = match filter {
                MessageFilter::Sent => self.messages(&MessageQuery::sent_by(number)).await?.messages,
                MessageFilter::Received => {
                    self.messages(&MessageQuery::received_by(number))
                        .await?
                        .messages
                }
                MessageFilter::All => self.sent_and_received(number).await?,
            };
            return Ok(filter.apply(number, messages));
        }

        let numbers = self.phone_numbers().await?;
        let mut all = Vec::new();
        for number in &numbers {
            match self.sent_and_received(number).await {
                Ok(messages) => all.extend(messages),
                Err(e) if e.is_unauthorized() => return Err(e),
                Err(e) => {
                    tracing::warn!(number = number.as_str(), "Skipping number: {}", e);
                }
            }
        }
        Ok(dedupe_sorted(all))
    }
}

/// Messages between two account numbers are listed under both; keep one.
fn dedupe_sorted(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Message> = messages
        .into_iter()
        .filter(|m| seen.insert(m.sid.clone()))
        .collect();
    sort_by_date(&mut unique);
    unique
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sid: &str, secs: i64) -> Message {
        Message {
            sid: sid.to_string(),
            from: "+15550001111".to_string(),
            to: "+15550002222".to_string(),
            body: String::new(),
            status: "delivered".to_string(),
            date: chrono::DateTime::from_timestamp(secs, 0),
            direction: "outbound-api".to_string(),
            num_media: "0".to_string(),
            has_media: false,
        }
    }

    #[test]
    fn test_dedupe_sorted() {
        let merged = dedupe_sorted(vec![msg("SM2", 20), msg("SM1", 10), msg("SM2", 20)]);
        let sids: Vec<&str> = merged.iter().map(|m| m.sid.as_str()).collect();
        assert_eq!(sids, vec!["SM1", "SM2"]);
    }

    #[test]
    fn test_urls() {
        let client = InboxClient::new("http://localhost:3001/twilio-sms-web/", Some(" ".into()));
        assert!(!client.has_session());
        assert_eq!(
            client.login_url(),
            "http://localhost:3001/twilio-sms-web/auth/login"
        );
        assert_eq!(
            client.url("/messages"),
            "http://localhost:3001/twilio-sms-web/api/messages"
        );
    }

    fn client_path(sid: &str) -> String {
        InboxClient::new("http://h", None).url(&format!("/messages/{}", encode_segment(sid)))
    }

    #[test]
    fn test_path_segments_are_escaped() {
        assert_eq!(encode_segment("SM123abc"), "SM123abc");
        assert_eq!(encode_segment("../me?x=1"), "..%2Fme%3Fx%3D1");
        assert_eq!(client_path("SM 1/2"), "http://h/api/messages/SM%201%2F2");
    }
}
