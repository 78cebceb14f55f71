//! Two-party thread with an inline composer.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use sms_inbox_core::{message::STATUS_FAILED, ComposerState, Message, ThreadView};

use super::input::Input;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Composer,
    Thread,
}

/// What a key press in the thread asks the app to do.
#[derive(Debug, PartialEq)]
pub enum ThreadAction {
    None,
    Task(Task),
    Back,
    OpenDetail(Message),
    Retry(Message),
}

#[derive(Debug)]
pub struct ConversationState {
    pub thread: ThreadView,
    pub composer: ComposerState,
    pub draft: Input,
    pub focus: Focus,
    /// Index into the visible messages while the thread has focus.
    pub selected: usize,
}

impl ConversationState {
    /// Open the thread between `from` and `to` and return its first load.
    pub fn open(from: &str, to: &str, account_numbers: Option<&[String]>) -> (Self, Task) {
        let mut thread = ThreadView::new(from, to);
        let load = thread.begin_load();
        let composer = account_numbers
            .map(|numbers| ComposerState::resolve(numbers, from, to))
            .unwrap_or_default();
        let state = Self {
            thread,
            composer,
            draft: Input::default(),
            focus: Focus::Composer,
            selected: 0,
        };
        (state, Task::LoadThread(load))
    }

    pub fn resolve_composer(&mut self, account_numbers: &[String]) {
        self.composer =
            ComposerState::resolve(account_numbers, self.thread.from(), self.thread.to());
    }

    pub fn selected_message(&self) -> Option<Message> {
        self.thread.visible().into_iter().nth(self.selected)
    }

    pub fn reload(&mut self) -> Task {
        Task::LoadThread(self.thread.begin_load())
    }

    /// Queue the draft as an optimistic send.
    pub fn send_draft(&mut self, loading_numbers: bool, now: DateTime<Utc>) -> Option<Task> {
        let draft = self.draft.value();
        if !self
            .composer
            .can_send(draft, self.thread.has_sending(), loading_numbers)
        {
            return None;
        }
        let request = self.composer.request(draft).ok()?;
        let id = self
            .thread
            .begin_send(&request.from, &request.to, &request.body, now);
        self.draft.clear();
        Some(Task::SendInThread { id, request })
    }

    /// Move a failed local message out of the thread so it can be resent.
    fn take_failed(&mut self) -> Option<Message> {
        let message = self.selected_message()?;
        if !message.is_local() || message.status != STATUS_FAILED {
            return None;
        }
        let id = self.thread.pending_id_for(&message.sid)?;
        self.thread.discard_pending(id)
    }

    pub fn handle_key(&mut self, key: KeyEvent, loading_numbers: bool) -> ThreadAction {
        if key.code == KeyCode::Esc {
            self.thread.cancel();
            return ThreadAction::Back;
        }
        if key.code == KeyCode::Tab {
            self.focus = match self.focus {
                Focus::Composer => {
                    self.selected = self.thread.len().saturating_sub(1);
                    Focus::Thread
                }
                Focus::Thread => Focus::Composer,
            };
            return ThreadAction::None;
        }

        match self.focus {
            Focus::Composer => match key.code {
                KeyCode::Enter => self
                    .send_draft(loading_numbers, Utc::now())
                    .map(ThreadAction::Task)
                    .unwrap_or(ThreadAction::None),
                _ => {
                    self.draft.handle_key(key);
                    ThreadAction::None
                }
            },
            Focus::Thread => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    if self.selected > 0 {
                        self.selected -= 1;
                        return ThreadAction::None;
                    }
                    match self.thread.begin_load_older() {
                        Some(request) => ThreadAction::Task(Task::LoadOlder(request)),
                        None => ThreadAction::None,
                    }
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.selected + 1 < self.thread.len() {
                        self.selected += 1;
                    }
                    ThreadAction::None
                }
                KeyCode::Enter | KeyCode::Char('i') => match self.selected_message() {
                    Some(message) if !message.is_local() => ThreadAction::OpenDetail(message),
                    _ => ThreadAction::None,
                },
                KeyCode::Char('r') => match self.take_failed() {
                    Some(message) => ThreadAction::Retry(message),
                    None => ThreadAction::Task(self.reload()),
                },
                _ => ThreadAction::None,
            },
        }
    }

    /// Keep the same message selected after older messages were prepended.
    pub fn older_loaded(&mut self, shift: usize) {
        self.selected = shift.saturating_sub(1);
    }
}
