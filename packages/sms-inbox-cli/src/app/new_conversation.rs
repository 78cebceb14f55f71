//! Pick an account number and a contact to start (or resume) a conversation.

use crossterm::event::{KeyCode, KeyEvent};
use sms_inbox_core::{
    composer::{is_valid_phone, normalize_recipient},
    conversation::{account_numbers, contacts, find_conversation},
    Conversation,
};

use super::input::Input;

/// Where the picker wants to go next.
#[derive(Debug, PartialEq, Eq)]
pub enum Destination {
    /// An existing conversation, by its latest message's `from`/`to`.
    Conversation { from: String, to: String },
    /// The send form for a pair with no history yet.
    Send { from: String, to: String },
}

#[derive(Debug)]
pub struct NewConversationState {
    pub accounts: Vec<String>,
    pub account: usize,
    pub contacts: Vec<String>,
    pub contact: Input,
    /// Position while browsing `contacts` with the arrow keys.
    browsing: Option<usize>,
}

impl NewConversationState {
    /// Accounts and contacts come from the loaded conversations; with no
    /// history the account's own numbers are offered instead.
    pub fn new(conversations: &[Conversation], fallback_accounts: Option<&[String]>) -> Self {
        let mut accounts = account_numbers(conversations);
        if accounts.is_empty() {
            accounts = fallback_accounts.map(<[String]>::to_vec).unwrap_or_default();
        }
        Self {
            accounts,
            account: 0,
            contacts: contacts(conversations),
            contact: Input::default(),
            browsing: None,
        }
    }

    pub fn selected_account(&self) -> Option<&str> {
        self.accounts.get(self.account).map(String::as_str)
    }

    pub fn recipient(&self) -> Option<String> {
        let raw = self.contact.value().trim();
        if raw.is_empty() {
            return None;
        }
        Some(normalize_recipient(raw))
    }

    /// Contacts matching what has been typed so far.
    pub fn suggestions(&self) -> Vec<&str> {
        let typed: String = self
            .contact
            .value()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        self.contacts
            .iter()
            .map(String::as_str)
            .filter(|c| c.contains(typed.as_str()))
            .collect()
    }

    /// The conversation the current choice already has, if any.
    fn existing(&self, conversations: &[Conversation]) -> Option<Destination> {
        let account = self.selected_account()?;
        let contact = self.recipient()?;
        find_conversation(conversations, account, &contact).map(|c| Destination::Conversation {
            from: c.latest.from.clone(),
            to: c.latest.to.clone(),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.selected_account().is_some()
            && self.recipient().is_some_and(|r| is_valid_phone(&r))
    }

    fn browse(&mut self, forward: bool) {
        if self.contacts.is_empty() {
            return;
        }
        let count = self.contacts.len();
        let next = match (self.browsing, forward) {
            (None, true) => 0,
            (None, false) => count - 1,
            (Some(i), true) => (i + 1) % count,
            (Some(i), false) => (i + count - 1) % count,
        };
        self.browsing = Some(next);
        self.contact = Input::with_value(&self.contacts[next]);
    }

    /// Apply a key; navigates as soon as the choice matches a conversation.
    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        conversations: &[Conversation],
    ) -> Option<Destination> {
        match key.code {
            KeyCode::Tab if !self.accounts.is_empty() => {
                self.account = (self.account + 1) % self.accounts.len();
            }
            KeyCode::BackTab if !self.accounts.is_empty() => {
                let count = self.accounts.len();
                self.account = (self.account + count - 1) % count;
            }
            KeyCode::Down => self.browse(true),
            KeyCode::Up => self.browse(false),
            KeyCode::Enter => {
                if let Some(existing) = self.existing(conversations) {
                    return Some(existing);
                }
                if self.is_valid() {
                    let from = self.selected_account()?.to_string();
                    let to = self.recipient()?;
                    return Some(Destination::Send { from, to });
                }
                return None;
            }
            _ => {
                if self.contact.handle_key(key) {
                    self.browsing = None;
                }
            }
        }
        self.existing(conversations)
    }
}
