//! Stand-alone send form.

use crossterm::event::{KeyCode, KeyEvent};
use sms_inbox_core::{Result, SendForm, SendRequest};

use super::input::Input;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendField {
    From,
    To,
    Body,
}

#[derive(Debug)]
pub struct SendState {
    /// Sending number, picked from the account's numbers.
    pub from: String,
    pub to: Input,
    pub body: Input,
    pub focus: SendField,
    pub sending: bool,
    pub error: Option<String>,
}

impl SendState {
    pub fn prefilled(from: &str, to: &str, body: &str) -> Self {
        let focus = if to.is_empty() {
            SendField::To
        } else {
            SendField::Body
        };
        Self {
            from: from.to_string(),
            to: Input::with_value(to),
            body: Input::with_value(body),
            focus,
            sending: false,
            error: None,
        }
    }

    pub fn form(&self) -> SendForm {
        let mut form = SendForm::prefilled(&self.from, "", self.body.value());
        form.set_recipient(self.to.value());
        form
    }

    /// Default the sender once the account's numbers are known.
    pub fn numbers_loaded(&mut self, account_numbers: &[String]) {
        if self.from.is_empty() {
            if let Some(first) = account_numbers.first() {
                self.from = first.clone();
            }
        }
    }

    fn cycle_from(&mut self, account_numbers: &[String], forward: bool) {
        if account_numbers.is_empty() {
            return;
        }
        let count = account_numbers.len();
        let next = match account_numbers.iter().position(|n| n == &self.from) {
            Some(i) if forward => (i + 1) % count,
            Some(i) => (i + count - 1) % count,
            None => 0,
        };
        self.from = account_numbers[next].clone();
    }

    /// Validate and mark the form as sending.
    pub fn submit(&mut self, account_numbers: &[String]) -> Result<SendRequest> {
        match self.form().validate(account_numbers) {
            Ok(request) => {
                self.error = None;
                self.sending = true;
                Ok(request)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Apply an editing key. Returns `true` when the form asks to be submitted.
    pub fn handle_key(&mut self, key: KeyEvent, account_numbers: &[String]) -> bool {
        if self.sending {
            return false;
        }
        match key.code {
            KeyCode::Enter => return true,
            KeyCode::Tab | KeyCode::Down => {
                self.focus = match self.focus {
                    SendField::From => SendField::To,
                    SendField::To => SendField::Body,
                    SendField::Body => SendField::From,
                };
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = match self.focus {
                    SendField::From => SendField::Body,
                    SendField::To => SendField::From,
                    SendField::Body => SendField::To,
                };
            }
            _ => match self.focus {
                SendField::From => match key.code {
                    KeyCode::Right | KeyCode::Char(' ') => self.cycle_from(account_numbers, true),
                    KeyCode::Left => self.cycle_from(account_numbers, false),
                    _ => {}
                },
                SendField::To => {
                    self.to.handle_key(key);
                }
                SendField::Body => {
                    self.body.handle_key(key);
                }
            },
        }
        false
    }
}
