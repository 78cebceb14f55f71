//! # Conversations
//!
//! A conversation is not stored anywhere. It is derived on every fetch by
//! folding the flat message list into groups keyed by the unordered pair of
//! participant numbers.
//!
//! ```text
//!   A → B  t1 ─┐
//!   B → A  t3 ─┼──►  key "A__B"  latest = (B → A, t3)
//!   A → B  t2 ─┘
//!   A → C  t4 ────►  key "A__C"  latest = (A → C, t4)
//!
//!   list order: A__C (t4), A__B (t3)      newest first
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::{sort_by_date, Message};

/// Symmetric key for a pair of participant numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey(String);

impl ConversationKey {
    /// Build the key for two numbers. The order of `a` and `b` does not matter.
    pub fn new(a: &str, b: &str) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}__{}", lo, hi))
    }

    /// Key of the conversation a message belongs to.
    pub fn of(message: &Message) -> Self {
        Self::new(&message.from, &message.to)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A derived conversation: its key, most recent message and participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub key: ConversationKey,
    pub latest: Message,
    /// `[from, to]` of the latest message.
    pub participants: [String; 2],
}

impl Conversation {
    fn from_message(key: ConversationKey, message: &Message) -> Self {
        Self {
            key,
            participants: [message.from.clone(), message.to.clone()],
            latest: message.clone(),
        }
    }

    /// Whether `number` is one of the two participants.
    pub fn involves(&self, number: &str) -> bool {
        self.participants.iter().any(|p| p == number)
    }

    /// Counterpart of the latest message, shown as the conversation title.
    pub fn display_name(&self) -> &str {
        self.latest.counterpart()
    }

    /// One-line preview of the latest message.
    pub fn preview(&self) -> &str {
        message_preview(&self.latest)
    }
}

/// Group messages by participant pair, newest conversation first.
///
/// Each group keeps only the message with the latest timestamp. On a tie the
/// first message seen wins, so the result is stable for a given input order.
pub fn build_conversations(messages: &[Message]) -> Vec<Conversation> {
    let mut groups: HashMap<ConversationKey, Conversation> = HashMap::new();

    for message in messages {
        let key = ConversationKey::of(message);
        match groups.get_mut(&key) {
            Some(existing) if message.timestamp_millis() > existing.latest.timestamp_millis() => {
                *existing = Conversation::from_message(key, message);
            }
            Some(_) => {}
            None => {
                groups.insert(key.clone(), Conversation::from_message(key, message));
            }
        }
    }

    let mut conversations: Vec<Conversation> = groups.into_values().collect();
    conversations.sort_by(|a, b| {
        b.latest
            .timestamp_millis()
            .cmp(&a.latest.timestamp_millis())
            .then_with(|| a.key.cmp(&b.key))
    });
    conversations
}

/// Keep conversations involving `number`; `None` keeps everything.
pub fn filter_by_number(conversations: Vec<Conversation>, number: Option<&str>) -> Vec<Conversation> {
    match number {
        Some(n) => conversations.into_iter().filter(|c| c.involves(n)).collect(),
        None => conversations,
    }
}

/// Every distinct number appearing in the messages, sorted.
pub fn participant_numbers(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .flat_map(|m| [m.from.as_str(), m.to.as_str()])
        .filter(|n| !n.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct account-side numbers across conversations, in list order.
pub fn account_numbers(conversations: &[Conversation]) -> Vec<String> {
    distinct(conversations.iter().map(|c| c.latest.account_side()))
}

/// Distinct contacts (counterparts) across conversations, in list order.
pub fn contacts(conversations: &[Conversation]) -> Vec<String> {
    distinct(conversations.iter().map(|c| c.latest.counterpart()))
}

fn distinct<'a>(numbers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    numbers
        .filter(|n| seen.insert(*n))
        .map(str::to_string)
        .collect()
}

/// Existing conversation between an account number and a contact, if any.
pub fn find_conversation<'a>(
    conversations: &'a [Conversation],
    account: &str,
    contact: &str,
) -> Option<&'a Conversation> {
    if account.is_empty() || contact.is_empty() {
        return None;
    }
    let key = ConversationKey::new(account, contact);
    conversations.iter().find(|c| c.key == key)
}

/// Preview text for a message in the conversation list.
pub fn message_preview(message: &Message) -> &str {
    if !message.body.is_empty() {
        &message.body
    } else if message.has_media || message.media_count() > 0 {
        "Message contains media"
    } else {
        "No message content"
    }
}

/// Which side of a single number's traffic to show in the inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFilter {
    #[default]
    All,
    Sent,
    Received,
}

impl MessageFilter {
    /// Keep only messages matching this filter for `number`, sorted ascending.
    pub fn apply(self, number: &str, messages: Vec<Message>) -> Vec<Message> {
        let mut kept: Vec<Message> = match self {
            MessageFilter::All => messages,
            MessageFilter::Sent => messages.into_iter().filter(|m| m.from == number).collect(),
            MessageFilter::Received => messages.into_iter().filter(|m| m.to == number).collect(),
        };
        sort_by_date(&mut kept);
        kept
    }

    pub fn label(self) -> &'static str {
        match self {
            MessageFilter::All => "all",
            MessageFilter::Sent => "sent",
            MessageFilter::Received => "received",
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    const NUMBERS: [&str; 4] = ["+1000", "+2000", "+3000", "+4000"];

    fn arb_messages() -> impl Strategy<Value = Vec<Message>> {
        prop::collection::vec((0..4usize, 0..4usize, 0..1_000i64), 0..40).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (f, t, secs))| Message {
                    sid: format!("SM{}", i),
                    from: NUMBERS[f].to_string(),
                    to: NUMBERS[t].to_string(),
                    body: String::new(),
                    status: String::new(),
                    date: Some(Utc.timestamp_opt(secs, 0).unwrap()),
                    direction: "inbound".to_string(),
                    num_media: "0".to_string(),
                    has_media: false,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_one_entry_per_pair_with_max_timestamp(messages in arb_messages()) {
            let conversations = build_conversations(&messages);

            let keys: BTreeSet<_> = messages.iter().map(ConversationKey::of).collect();
            prop_assert_eq!(conversations.len(), keys.len());

            for conversation in &conversations {
                let max = messages
                    .iter()
                    .filter(|m| ConversationKey::of(m) == conversation.key)
                    .map(Message::timestamp_millis)
                    .max()
                    .unwrap();
                prop_assert_eq!(conversation.latest.timestamp_millis(), max);
            }
        }

        #[test]
        fn prop_list_is_non_increasing(messages in arb_messages()) {
            let conversations = build_conversations(&messages);
            for pair in conversations.windows(2) {
                prop_assert!(pair[0].latest.timestamp_millis() >= pair[1].latest.timestamp_millis());
            }
        }

        #[test]
        fn prop_grouping_is_idempotent(messages in arb_messages()) {
            let once = build_conversations(&messages);
            let latest: Vec<Message> = once.iter().map(|c| c.latest.clone()).collect();
            let twice = build_conversations(&latest);
            prop_assert_eq!(once, twice);
        }
    }
}
