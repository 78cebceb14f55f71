//! Messaging gateway.
//!
//! A thin request/response seam over the SMS provider. Handlers only see
//! the [`MessagingGateway`] trait; production wires in
//! [`TwilioGateway`](twilio::TwilioGateway), tests wire in a fake.

pub mod twilio;

use async_trait::async_trait;
use sms_inbox_core::{Message, MessagePage, MessageQuery, SendRequest};
use thiserror::Error;

pub use twilio::TwilioGateway;

/// Failures talking to the provider.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider answered with a non-success status.
    #[error("{message}")]
    Provider { status: u16, message: String },

    #[error("Failed to reach the messaging provider: {0}")]
    Transport(String),

    #[error("Unexpected response from the messaging provider: {0}")]
    Decode(String),

    /// A page token that does not belong to this account's message listing.
    #[error("Invalid page token")]
    InvalidCursor,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Operations the inbox needs from the SMS provider.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// One page of messages matching `query` (at least one of from/to),
    /// sorted ascending by date.
    async fn list_messages(&self, query: &MessageQuery, page_size: u32)
        -> GatewayResult<MessagePage>;

    async fn fetch_message(&self, sid: &str) -> GatewayResult<Message>;

    /// Account phone numbers that can send SMS.
    async fn list_sms_numbers(&self) -> GatewayResult<Vec<String>>;

    /// Send a message, returning the provider message sid.
    async fn send_message(&self, request: &SendRequest) -> GatewayResult<String>;

    /// Public URLs of the media attached to a message.
    async fn list_media(&self, message_sid: &str) -> GatewayResult<Vec<String>>;

    /// The app's sync document, created empty on first use.
    async fn get_or_create_document(&self) -> GatewayResult<serde_json::Value>;
}
