//! Application state and the reducer that drives it.
//!
//! ```text
//!   key press ──► App::handle_key ─┐
//!                                  ├──► screen state ──► queued Tasks ──► task::spawn
//!   TaskResult ─► App::apply ──────┘                                          │
//!        ▲                                                                    │
//!        └──────────────────────── event channel ◄────────────────────────────┘
//! ```
//!
//! Nothing here touches the terminal or the network, so every transition
//! is testable by feeding keys and results.

pub mod conversation;
pub mod detail;
pub mod inbox;
pub mod input;
pub mod new_conversation;
pub mod send;

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use sms_inbox_core::{toast, Error, Message, Principal, Toast};

use crate::task::{Task, TaskResult};
use conversation::{ConversationState, ThreadAction};
use detail::DetailState;
use inbox::InboxState;
use new_conversation::{Destination, NewConversationState};
use send::SendState;

#[derive(Debug)]
pub enum Screen {
    SignIn {
        checking: bool,
        message: Option<String>,
    },
    Inbox,
    Conversation(ConversationState),
    NewConversation(NewConversationState),
    Send(SendState),
    Detail(DetailState),
}

pub struct App {
    pub screen: Screen,
    pub inbox: InboxState,
    /// Numbers the account can send from; `None` until loaded.
    pub account_numbers: Option<Vec<String>>,
    pub numbers_loading: bool,
    pub user: Option<Principal>,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    pub login_url: String,
    logout_url: String,
    login_opened: bool,
    tasks: Vec<Task>,
}

impl App {
    pub fn new(login_url: String, logout_url: String) -> Self {
        Self {
            screen: Screen::SignIn {
                checking: true,
                message: None,
            },
            inbox: InboxState::default(),
            account_numbers: None,
            numbers_loading: false,
            user: None,
            toast: None,
            should_quit: false,
            login_url,
            logout_url,
            login_opened: false,
            tasks: vec![Task::CheckSession],
        }
    }

    /// Work queued since the last call.
    pub fn take_tasks(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks)
    }

    pub fn tick(&mut self, now: Instant) {
        toast::expire(&mut self.toast, now);
    }

    fn numbers(&self) -> &[String] {
        self.account_numbers.as_deref().unwrap_or(&[])
    }

    fn ensure_account_numbers(&mut self) {
        if self.account_numbers.is_none() && !self.numbers_loading {
            self.numbers_loading = true;
            self.tasks.push(Task::LoadAccountNumbers);
        }
    }

    // ── Navigation ────────────────────────────────────────────────────────

    fn sign_in(&mut self, message: Option<String>) {
        self.user = None;
        self.screen = Screen::SignIn {
            checking: false,
            message,
        };
        if !self.login_opened {
            self.login_opened = true;
            self.tasks.push(Task::OpenBrowser {
                url: self.login_url.clone(),
            });
        }
    }

    fn show_inbox(&mut self) {
        self.screen = Screen::Inbox;
        let load = self.inbox.begin_load();
        self.tasks.push(load);
    }

    fn open_conversation(&mut self, from: &str, to: &str) {
        let (state, load) = ConversationState::open(from, to, self.account_numbers.as_deref());
        self.screen = Screen::Conversation(state);
        self.tasks.push(load);
        self.ensure_account_numbers();
    }

    fn open_send(&mut self, from: &str, to: &str, body: &str) {
        let mut state = SendState::prefilled(from, to, body);
        state.numbers_loaded(self.numbers());
        self.screen = Screen::Send(state);
        self.ensure_account_numbers();
    }

    fn open_detail(&mut self, sid: &str, sent: bool) {
        let (state, load) = DetailState::open(sid, sent);
        self.screen = Screen::Detail(state);
        self.tasks.push(load);
    }

    fn open_new_conversation(&mut self) {
        let state = NewConversationState::new(
            &self.inbox.all_conversations(),
            self.account_numbers.as_deref(),
        );
        self.screen = Screen::NewConversation(state);
        self.ensure_account_numbers();
    }

    /// Common handling for a failed request. Returns `true` if the error
    /// ended the session.
    fn session_lost(&mut self, error: &Error) -> bool {
        if error.is_unauthorized() {
            tracing::info!("Session is no longer valid");
            self.sign_in(Some(error.to_string()));
            return true;
        }
        false
    }

    // ── Keys ──────────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match &mut self.screen {
            Screen::SignIn { checking, .. } => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('l') | KeyCode::Enter => self.tasks.push(Task::OpenBrowser {
                    url: self.login_url.clone(),
                }),
                KeyCode::Char('r') => {
                    *checking = true;
                    self.tasks.push(Task::CheckSession);
                }
                _ => {}
            },
            Screen::Inbox => self.inbox_key(key),
            Screen::Conversation(state) => {
                match state.handle_key(key, self.numbers_loading) {
                    ThreadAction::None => {}
                    ThreadAction::Task(task) => self.tasks.push(task),
                    ThreadAction::Back => self.show_inbox(),
                    ThreadAction::OpenDetail(message) => self.open_detail(&message.sid, false),
                    ThreadAction::Retry(message) => {
                        self.open_send(&message.from, &message.to, &message.body)
                    }
                }
            }
            Screen::NewConversation(state) => {
                if key.code == KeyCode::Esc {
                    self.screen = Screen::Inbox;
                    return;
                }
                match state.handle_key(key, &self.inbox.all_conversations()) {
                    Some(Destination::Conversation { from, to }) => {
                        self.open_conversation(&from, &to)
                    }
                    Some(Destination::Send { from, to }) => self.open_send(&from, &to, ""),
                    None => {}
                }
            }
            Screen::Send(state) => {
                if key.code == KeyCode::Esc && !state.sending {
                    self.show_inbox();
                    return;
                }
                let numbers = self.account_numbers.as_deref().unwrap_or(&[]);
                if state.handle_key(key, numbers) && !self.numbers_loading {
                    if let Ok(request) = state.submit(numbers) {
                        self.tasks.push(Task::SendForm(request));
                    }
                }
            }
            Screen::Detail(state) => {
                let message = state.message.clone();
                let reply = state.reply_pair();
                let sent = state.sent;
                let media = state.media.first().cloned();
                self.detail_key(key, message, reply, sent, media);
            }
        }
    }

    fn inbox_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.inbox.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.inbox.select_prev(),
            KeyCode::Enter => {
                if let Some(conversation) = self.inbox.selected_conversation() {
                    let from = conversation.latest.from.clone();
                    let to = conversation.latest.to.clone();
                    self.open_conversation(&from, &to);
                }
            }
            KeyCode::Char('f') => {
                let load = self.inbox.cycle_number(true);
                self.tasks.push(load);
            }
            KeyCode::Char('F') => {
                let load = self.inbox.cycle_number(false);
                self.tasks.push(load);
            }
            KeyCode::Char('t') => {
                if let Some(load) = self.inbox.cycle_filter() {
                    self.tasks.push(load);
                }
            }
            KeyCode::Char('r') => {
                let load = self.inbox.begin_load();
                self.tasks.push(load);
            }
            KeyCode::Char('n') => self.open_new_conversation(),
            KeyCode::Char('s') => self.open_send("", "", ""),
            KeyCode::Char('L') => {
                self.tasks.push(Task::OpenBrowser {
                    url: self.logout_url.clone(),
                });
                self.user = None;
                self.screen = Screen::SignIn {
                    checking: false,
                    message: Some("Signed out.".to_string()),
                };
            }
            _ => {}
        }
    }

    fn detail_key(
        &mut self,
        key: KeyEvent,
        message: Option<Message>,
        reply: Option<(String, String)>,
        sent: bool,
        media: Option<String>,
    ) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.show_inbox(),
            KeyCode::Char('c') => {
                if let Some(message) = message {
                    self.open_conversation(&message.from, &message.to);
                }
            }
            KeyCode::Char('r') => {
                if let Some((from, to)) = reply {
                    self.open_send(&from, &to, "");
                }
            }
            KeyCode::Char('n') if sent => self.open_send("", "", ""),
            KeyCode::Char('o') => {
                if let Some(url) = media {
                    self.tasks.push(Task::OpenBrowser { url });
                }
            }
            _ => {}
        }
    }

    // ── Results ───────────────────────────────────────────────────────────

    pub fn apply(&mut self, result: TaskResult) {
        match result {
            TaskResult::Session(Ok(user)) => {
                tracing::info!(user = user.id.as_str(), "Signed in");
                self.user = Some(user);
                self.ensure_account_numbers();
                self.show_inbox();
            }
            TaskResult::Session(Err(e)) => {
                if !self.session_lost(&e) {
                    self.screen = Screen::SignIn {
                        checking: false,
                        message: Some(e.to_string()),
                    };
                }
            }
            TaskResult::Inbox { generation, result } => {
                if let Err(e) = self.inbox.apply(generation, result) {
                    self.session_lost(&e);
                }
            }
            TaskResult::AccountNumbers(result) => self.numbers_loaded(result),
            TaskResult::Thread { generation, result } => {
                let Screen::Conversation(state) = &mut self.screen else {
                    return;
                };
                match result {
                    Ok((forward, reverse)) => {
                        state.thread.apply_first_page(generation, forward, reverse);
                    }
                    Err(e) => {
                        if state.thread.apply_error(generation, e.to_string()) {
                            self.session_lost(&e);
                        }
                    }
                }
            }
            TaskResult::Older { generation, result } => {
                let Screen::Conversation(state) = &mut self.screen else {
                    return;
                };
                match result {
                    Ok((forward, reverse)) => {
                        let shift = state.thread.apply_older_page(generation, forward, reverse);
                        if let Some(shift) = shift {
                            state.older_loaded(shift);
                        }
                    }
                    Err(e) => {
                        if state.thread.apply_error(generation, e.to_string()) {
                            self.session_lost(&e);
                        }
                    }
                }
            }
            TaskResult::SentInThread { id, result } => match result {
                Ok(sid) => {
                    if let Screen::Conversation(state) = &mut self.screen {
                        if state.thread.confirm_send(id, &sid) {
                            let load = state.reload();
                            self.tasks.push(load);
                        }
                    }
                }
                Err(e) => {
                    if let Screen::Conversation(state) = &mut self.screen {
                        state.thread.fail_send(id);
                    }
                    if !self.session_lost(&e) {
                        self.toast = Some(Toast::send_failed(e.to_string(), Instant::now()));
                    }
                }
            },
            TaskResult::SentForm(result) => {
                let Screen::Send(state) = &mut self.screen else {
                    return;
                };
                state.sending = false;
                match result {
                    Ok(sid) => self.open_detail(&sid, true),
                    Err(e) => {
                        state.error = Some(e.to_string());
                        if !self.session_lost(&e) {
                            self.toast = Some(Toast::send_failed(e.to_string(), Instant::now()));
                        }
                    }
                }
            }
            TaskResult::Detail { sid, result } => {
                let Screen::Detail(state) = &mut self.screen else {
                    return;
                };
                if let Err(e) = state.apply(&sid, result) {
                    self.session_lost(&e);
                }
            }
        }
    }

    fn numbers_loaded(&mut self, result: sms_inbox_core::Result<Vec<String>>) {
        self.numbers_loading = false;
        match result {
            Ok(numbers) => {
                match &mut self.screen {
                    Screen::Conversation(state) => state.resolve_composer(&numbers),
                    Screen::Send(state) => state.numbers_loaded(&numbers),
                    _ => {}
                }
                self.account_numbers = Some(numbers);
            }
            Err(e) => {
                if !self.session_lost(&e) {
                    tracing::warn!("Failed to load phone numbers: {}", e);
                    self.toast = Some(Toast::new(
                        "Unable to load phone numbers",
                        e.to_string(),
                        Instant::now(),
                    ));
                }
            }
        }
    }
}
