//! # SMS Inbox Core
//!
//! Shared wire types and UI-agnostic view logic for the SMS inbox.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SMS INBOX COMPONENTS                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   sms-inbox-cli                          sms-inbox-server               │
//! │  ┌──────────────────────┐   REST/JSON   ┌──────────────────────────┐    │
//! │  │ screens (ratatui)    │ ────────────► │ /auth/*  (OpenID Connect) │    │
//! │  │ data layer (reqwest) │ ◄──────────── │ /api/*   (session guard)  │    │
//! │  └──────────┬───────────┘               └────────────┬─────────────┘    │
//! │             │                                        │                  │
//! │             ▼                                        ▼                  │
//! │  ┌──────────────────────────────────┐    ┌──────────────────────────┐   │
//! │  │ sms-inbox-core                   │    │ Twilio REST API          │   │
//! │  │ - message / principal wire types │    │ - Messages, Media        │   │
//! │  │ - conversation grouping          │    │ - IncomingPhoneNumbers   │   │
//! │  │ - thread merge + pending overlay │    │ - Sync documents         │   │
//! │  │ - composer eligibility, toasts   │    └──────────────────────────┘   │
//! │  └──────────────────────────────────┘                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error type shared by the client data layer
//! - [`message`] - Wire types exchanged with the server
//! - [`conversation`] - Grouping a flat message list into conversations
//! - [`thread`] - A two-party thread: paging cursors and optimistic sends
//! - [`composer`] - Send eligibility and draft validation
//! - [`toast`] - Auto-dismissing notices
//! - [`time`] - Relative time labels

pub mod composer;
pub mod conversation;
pub mod error;
pub mod message;
pub mod thread;
pub mod time;
pub mod toast;

pub use composer::{ComposerState, SendForm, MAX_BODY_LEN};
pub use conversation::{build_conversations, Conversation, ConversationKey, MessageFilter};
pub use error::{Error, Result};
pub use message::{
    ErrorBody, MeResponse, Message, MessagePage, MessageQuery, Principal, SendRequest,
    SendResponse,
};
pub use thread::{PendingId, ThreadView};
pub use toast::{Toast, TOAST_TTL};

/// Name of the server's session cookie.
pub const SESSION_COOKIE: &str = "sms_inbox_session";

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
