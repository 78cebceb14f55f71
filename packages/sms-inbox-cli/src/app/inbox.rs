//! Conversation list state.

use sms_inbox_core::{
    build_conversations,
    conversation::{filter_by_number, participant_numbers},
    Conversation, Message, MessageFilter, Result,
};

use crate::task::Task;

#[derive(Debug, Default)]
pub struct InboxState {
    messages: Vec<Message>,
    conversations: Vec<Conversation>,
    /// Every number seen in the last unfiltered load; the phone filter choices.
    pub numbers: Vec<String>,
    /// Selected phone filter; `None` shows every number.
    pub number: Option<String>,
    pub filter: MessageFilter,
    pub selected: usize,
    pub loading: bool,
    pub error: Option<String>,
    generation: u64,
}

impl InboxState {
    /// Conversations to list, newest first.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Every conversation in the last load, ignoring the phone filter.
    pub fn all_conversations(&self) -> Vec<Conversation> {
        build_conversations(&self.messages)
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.conversations.get(self.selected)
    }

    pub fn begin_load(&mut self) -> Task {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        Task::LoadInbox {
            generation: self.generation,
            number: self.number.clone(),
            filter: self.filter,
        }
    }

    /// Apply a finished load. Stale results are dropped; errors are handed
    /// back so the app can react to an expired session.
    pub fn apply(&mut self, generation: u64, result: Result<Vec<Message>>) -> Result<()> {
        if generation != self.generation {
            return Ok(());
        }
        self.loading = false;
        match result {
            Ok(messages) => {
                if self.number.is_none() {
                    self.numbers = participant_numbers(&messages);
                }
                self.messages = messages;
                self.regroup();
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn regroup(&mut self) {
        self.conversations =
            filter_by_number(build_conversations(&self.messages), self.number.as_deref());
        self.selected = self.selected.min(self.conversations.len().saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.conversations.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Cycle the phone filter: all, then each number in turn.
    pub fn cycle_number(&mut self, forward: bool) -> Task {
        let position = self
            .number
            .as_ref()
            .and_then(|n| self.numbers.iter().position(|x| x == n));
        let count = self.numbers.len();
        let next = match (position, forward) {
            _ if count == 0 => None,
            (None, true) => Some(0),
            (None, false) => Some(count - 1),
            (Some(i), true) if i + 1 < count => Some(i + 1),
            (Some(i), false) if i > 0 => Some(i - 1),
            (Some(_), _) => None,
        };
        self.number = next.map(|i| self.numbers[i].clone());
        if self.number.is_none() {
            self.filter = MessageFilter::All;
        }
        self.selected = 0;
        self.begin_load()
    }

    /// Cycle all / sent / received for the selected number.
    pub fn cycle_filter(&mut self) -> Option<Task> {
        self.number.as_ref()?;
        self.filter = match self.filter {
            MessageFilter::All => MessageFilter::Sent,
            MessageFilter::Sent => MessageFilter::Received,
            MessageFilter::Received => MessageFilter::All,
        };
        self.selected = 0;
        Some(self.begin_load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sms_inbox_core::Error;

    fn msg(sid: &str, from: &str, to: &str, secs: i64) -> Message {
        Message {
            sid: sid.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            body: sid.to_string(),
            status: "delivered".to_string(),
            date: chrono::DateTime::from_timestamp(secs, 0),
            direction: "inbound".to_string(),
            num_media: "0".to_string(),
            has_media: false,
        }
    }

    fn loaded() -> InboxState {
        let mut inbox = InboxState::default();
        let Task::LoadInbox { generation, .. } = inbox.begin_load() else {
            panic!("expected an inbox load");
        };
        inbox
            .apply(
                generation,
                Ok(vec![
                    msg("SM1", "+1A", "+1B", 10),
                    msg("SM2", "+1B", "+1A", 20),
                    msg("SM3", "+1C", "+1A", 15),
                ]),
            )
            .unwrap();
        inbox
    }

    #[test]
    fn test_load_groups_conversations() {
        let inbox = loaded();
        assert!(!inbox.loading);
        let latest: Vec<&str> = inbox
            .conversations()
            .iter()
            .map(|c| c.latest.sid.as_str())
            .collect();
        assert_eq!(latest, vec!["SM2", "SM3"]);
        assert_eq!(inbox.numbers, vec!["+1A", "+1B", "+1C"]);
    }

    #[test]
    fn test_stale_load_dropped() {
        let mut inbox = loaded();
        let _first = inbox.begin_load();
        let _second = inbox.begin_load();
        inbox.apply(1, Ok(Vec::new())).unwrap();
        assert_eq!(inbox.conversations().len(), 2);
        assert!(inbox.loading);
    }

    #[test]
    fn test_error_is_reported() {
        let mut inbox = InboxState::default();
        let Task::LoadInbox { generation, .. } = inbox.begin_load() else {
            panic!("expected an inbox load");
        };
        let err = inbox.apply(generation, Err(Error::Unauthorized)).unwrap_err();
        assert!(err.is_unauthorized());
        assert!(inbox.error.is_some());
    }

    #[test]
    fn test_cycle_number_filter() {
        let mut inbox = loaded();
        let task = inbox.cycle_number(true);
        assert_eq!(inbox.number.as_deref(), Some("+1A"));
        assert!(matches!(task, Task::LoadInbox { number: Some(ref n), .. } if n == "+1A"));

        assert!(inbox.cycle_filter().is_some());
        assert_eq!(inbox.filter, MessageFilter::Sent);

        inbox.cycle_number(false);
        assert_eq!(inbox.number, None);
        assert_eq!(inbox.filter, MessageFilter::All);
        assert!(inbox.cycle_filter().is_none());
    }
}
