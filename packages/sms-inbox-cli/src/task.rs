//! Background network work.
//!
//! The app never awaits the network itself: it queues [`Task`]s, the main
//! loop spawns them here, and each reports a [`TaskResult`] back through the
//! event channel. Results carry whatever tag (generation, pending id) the
//! app needs to recognise and drop stale ones.

use sms_inbox_core::{
    thread::LoadRequest, Message, MessageFilter, MessagePage, PendingId, Principal, Result,
    SendRequest,
};
use tokio::sync::mpsc;

use crate::client::InboxClient;
use crate::event::Event;

#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    CheckSession,
    LoadInbox {
        generation: u64,
        number: Option<String>,
        filter: MessageFilter,
    },
    LoadAccountNumbers,
    LoadThread(LoadRequest),
    LoadOlder(LoadRequest),
    SendInThread {
        id: PendingId,
        request: SendRequest,
    },
    SendForm(SendRequest),
    LoadDetail {
        sid: String,
    },
    OpenBrowser {
        url: String,
    },
}

#[derive(Debug)]
pub enum TaskResult {
    Session(Result<Principal>),
    Inbox {
        generation: u64,
        result: Result<Vec<Message>>,
    },
    AccountNumbers(Result<Vec<String>>),
    Thread {
        generation: u64,
        result: Result<(MessagePage, MessagePage)>,
    },
    Older {
        generation: u64,
        result: Result<(Option<MessagePage>, Option<MessagePage>)>,
    },
    SentInThread {
        id: PendingId,
        result: Result<String>,
    },
    SentForm(Result<String>),
    Detail {
        sid: String,
        result: Result<(Message, Vec<String>)>,
    },
}

/// Fetch one direction's page, or nothing when that direction is exhausted.
async fn optional_page(
    client: &InboxClient,
    query: Option<&sms_inbox_core::MessageQuery>,
) -> Result<Option<MessagePage>> {
    match query {
        Some(query) => client.messages(query).await.map(Some),
        None => Ok(None),
    }
}

async fn execute(client: &InboxClient, task: Task) -> Option<TaskResult> {
    let result = match task {
        Task::CheckSession => TaskResult::Session(client.me().await),
        Task::LoadInbox {
            generation,
            number,
            filter,
        } => TaskResult::Inbox {
            generation,
            result: client.inbox_messages(number.as_deref(), filter).await,
        },
        Task::LoadAccountNumbers => TaskResult::AccountNumbers(client.phone_numbers().await),
        Task::LoadThread(request) => {
            let (forward, reverse) = tokio::join!(
                optional_page(client, request.forward.as_ref()),
                optional_page(client, request.reverse.as_ref())
            );
            let result = match (forward, reverse) {
                (Ok(f), Ok(r)) => Ok((f.unwrap_or_default(), r.unwrap_or_default())),
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            TaskResult::Thread {
                generation: request.generation,
                result,
            }
        }
        Task::LoadOlder(request) => {
            let (forward, reverse) = tokio::join!(
                optional_page(client, request.forward.as_ref()),
                optional_page(client, request.reverse.as_ref())
            );
            let result = match (forward, reverse) {
                (Ok(f), Ok(r)) => Ok((f, r)),
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            TaskResult::Older {
                generation: request.generation,
                result,
            }
        }
        Task::SendInThread { id, request } => TaskResult::SentInThread {
            id,
            result: client.send(&request).await,
        },
        Task::SendForm(request) => TaskResult::SentForm(client.send(&request).await),
        Task::LoadDetail { sid } => {
            let (message, media) = tokio::join!(client.message(&sid), client.media(&sid));
            let result = match message {
                // Media is best effort; the message itself is what the screen needs.
                Ok(m) => Ok((m, media.unwrap_or_default())),
                Err(e) => Err(e),
            };
            TaskResult::Detail { sid, result }
        }
        Task::OpenBrowser { url } => {
            open_browser(&url);
            return None;
        }
    };
    Some(result)
}

/// Hand `url` to the platform launcher without waiting for it to exit.
fn open_browser(url: &str) {
    if let Err(e) = open::that_detached(url) {
        tracing::warn!(url, "Failed to open browser: {}", e);
    }
}

/// Run a task in the background and post its result to the event loop.
pub fn spawn(client: InboxClient, task: Task, tx: mpsc::UnboundedSender<Event>) {
    tokio::spawn(async move {
        if let Some(result) = execute(&client, task).await {
            // The receiver is gone only when the app is shutting down.
            let _ = tx.send(Event::Task(result));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test(flavor = "current_thread")]
    async fn test_open_browser_does_not_wait_for_launcher() {
        let client = InboxClient::new("http://127.0.0.1:9", None);
        let task = Task::OpenBrowser {
            url: "file:///nonexistent/sms-inbox-test".to_string(),
        };
        let started = Instant::now();
        let result = execute(&client, task).await;
        assert!(result.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
