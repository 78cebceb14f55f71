//! Wire types exchanged between the inbox server and its clients.
//!
//! All JSON is camelCase. Messages are read-only copies of what the SMS
//! provider returned; nothing here is persisted locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status given to a locally constructed message while its send is in flight.
pub const STATUS_SENDING: &str = "sending";

/// Status given to a locally constructed message whose send failed.
pub const STATUS_FAILED: &str = "failed";

/// Status adopted by a pending message once the provider accepted it.
pub const STATUS_QUEUED: &str = "queued";

/// Provider status for messages the carrier could not deliver.
pub const STATUS_UNDELIVERED: &str = "undelivered";

/// A single SMS/MMS message as returned by `GET /api/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Provider message id (`SM...`/`MM...`), or a `temp-` id while pending.
    pub sid: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub status: String,
    /// Creation time. `None` sorts before every dated message.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Provider direction: `inbound`, `outbound-api`, `outbound-reply`, ...
    #[serde(default)]
    pub direction: String,
    /// Number of attached media items, as the provider reports it (a string).
    #[serde(default)]
    pub num_media: String,
    #[serde(default)]
    pub has_media: bool,
}

impl Message {
    /// Whether the account sent this message.
    pub fn is_outbound(&self) -> bool {
        self.direction.starts_with("outbound")
    }

    /// The number on the other side of the account, used as a display name.
    pub fn counterpart(&self) -> &str {
        if self.is_outbound() {
            &self.to
        } else {
            &self.from
        }
    }

    /// The number on the account side of the message.
    pub fn account_side(&self) -> &str {
        if self.is_outbound() {
            &self.from
        } else {
            &self.to
        }
    }

    /// Parsed media count; unparseable values count as zero.
    pub fn media_count(&self) -> u32 {
        self.num_media.trim().parse().unwrap_or(0)
    }

    /// Sort key in milliseconds; undated messages sort first.
    pub fn timestamp_millis(&self) -> i64 {
        self.date.map(|d| d.timestamp_millis()).unwrap_or(i64::MIN)
    }

    /// Whether this is a locally constructed message that never reached the provider.
    pub fn is_local(&self) -> bool {
        self.sid.starts_with("temp-")
    }

    /// Label shown under a message bubble.
    pub fn status_label(&self) -> &str {
        match self.status.as_str() {
            STATUS_FAILED => "Not Delivered",
            STATUS_UNDELIVERED => "sent",
            other => other,
        }
    }
}

/// Stable ascending sort by creation date.
pub fn sort_by_date(messages: &mut [Message]) {
    messages.sort_by_key(Message::timestamp_millis);
}

/// One page of messages plus the cursor for the next (older) page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Query parameters for `GET /api/messages`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl MessageQuery {
    /// Messages sent from `from` to `to`.
    pub fn between(from: &str, to: &str) -> Self {
        Self {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            ..Default::default()
        }
    }

    /// Messages sent by `number`.
    pub fn sent_by(number: &str) -> Self {
        Self {
            from: Some(number.to_string()),
            ..Default::default()
        }
    }

    /// Messages received by `number`.
    pub fn received_by(number: &str) -> Self {
        Self {
            to: Some(number.to_string()),
            ..Default::default()
        }
    }

    /// Continue from a cursor returned with a previous page.
    pub fn with_page_token(mut self, token: Option<String>) -> Self {
        self.page_token = token;
        self
    }

    /// `from`, ignoring blank values.
    pub fn from_filter(&self) -> Option<&str> {
        non_blank(self.from.as_deref())
    }

    /// `to`, ignoring blank values.
    pub fn to_filter(&self) -> Option<&str> {
        non_blank(self.to.as_deref())
    }

    /// At least one of `from`/`to` is present.
    pub fn has_filter(&self) -> bool {
        self.from_filter().is_some() || self.to_filter().is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The signed-in user, derived from OpenID Connect claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Subject (`sub`) claim.
    pub id: String,
    /// Userinfo claims as returned by the identity provider.
    #[serde(default)]
    pub profile: serde_json::Value,
    /// Raw ID token, kept for the logout `id_token_hint`.
    #[serde(default)]
    pub id_token: Option<String>,
}

impl Principal {
    /// Best human-readable name from the profile claims.
    pub fn display_name(&self) -> &str {
        ["name", "preferred_username", "email"]
            .iter()
            .find_map(|claim| {
                self.profile
                    .get(*claim)
                    .and_then(|v| v.as_str())
                    .filter(|v| !v.is_empty())
            })
            .unwrap_or(self.id.as_str())
    }
}

/// Body of `GET /api/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: Principal,
}

/// Body of `POST /api/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub from: String,
    pub to: String,
    pub body: String,
}

/// Response of `POST /api/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub sid: String,
}

/// JSON error body used by every failing API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
