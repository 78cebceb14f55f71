//! A single message with its media links.

use sms_inbox_core::{Message, Result};

use crate::task::Task;

#[derive(Debug)]
pub struct DetailState {
    pub sid: String,
    /// Reached right after sending from the form.
    pub sent: bool,
    pub message: Option<Message>,
    pub media: Vec<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl DetailState {
    pub fn open(sid: &str, sent: bool) -> (Self, Task) {
        let state = Self {
            sid: sid.to_string(),
            sent,
            message: None,
            media: Vec::new(),
            loading: true,
            error: None,
        };
        let task = Task::LoadDetail {
            sid: sid.to_string(),
        };
        (state, task)
    }

    pub fn title(&self) -> &'static str {
        if self.sent {
            "Message sent"
        } else {
            "Message"
        }
    }

    /// Apply a finished load for `sid`; results for another message are ignored.
    pub fn apply(&mut self, sid: &str, result: Result<(Message, Vec<String>)>) -> Result<()> {
        if sid != self.sid {
            return Ok(());
        }
        self.loading = false;
        match result {
            Ok((message, media)) => {
                self.message = Some(message);
                self.media = media;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// `from`/`to` for replying to a received message.
    pub fn reply_pair(&self) -> Option<(String, String)> {
        let message = self.message.as_ref()?;
        if message.is_outbound() {
            return None;
        }
        Some((message.to.clone(), message.from.clone()))
    }
}
