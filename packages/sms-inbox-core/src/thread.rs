//! # Conversation Thread
//!
//! State for one two-party thread: the confirmed messages from both
//! directions, one paging cursor per direction, and an overlay of messages
//! sent from this client that the provider has not listed yet.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          THREAD STATE                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   GET ?from=A&to=B  ──► page ─┐                                         │
//! │                               ├─► merge, dedupe by sid, sort ascending  │
//! │   GET ?from=B&to=A  ──► page ─┘          │                              │
//! │                                          ▼                              │
//! │                               confirmed messages                        │
//! │                                          +                              │
//! │   begin_send ──► pending overlay (temp-<uuid>, "sending")               │
//! │                     │                                                   │
//! │                     ├── confirm_send ──► adopts provider sid, "queued"  │
//! │                     └── fail_send    ──► "failed", kept until a reload  │
//! │                                          lists it or the user retries   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every load is tagged with a generation. Results carrying an older
//! generation are dropped, which is how leaving the screen (or switching to
//! another thread) cancels in-flight fetches.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::message::{
    sort_by_date, Message, MessagePage, MessageQuery, STATUS_FAILED, STATUS_QUEUED,
    STATUS_SENDING,
};

/// Client-generated id of an optimistic send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(Uuid);

impl PendingId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Sid given to the pending message until the provider assigns one.
    pub fn temp_sid(&self) -> String {
        format!("temp-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    /// No page fetched yet.
    Start,
    /// Provider token for the next older page.
    Next(String),
    /// The provider has no older page.
    Exhausted,
}

impl Cursor {
    fn from_page(page: &MessagePage) -> Self {
        match &page.next_page_token {
            Some(token) if !token.is_empty() => Cursor::Next(token.clone()),
            _ => Cursor::Exhausted,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingEntry {
    id: PendingId,
    message: Message,
}

/// Queries to issue for one load, tagged with the generation that issued them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: u64,
    /// `from → to` direction; `None` when that direction has no older page.
    pub forward: Option<MessageQuery>,
    /// `to → from` direction; `None` when that direction has no older page.
    pub reverse: Option<MessageQuery>,
}

/// View state of a two-party thread.
#[derive(Debug, Clone)]
pub struct ThreadView {
    from: String,
    to: String,
    confirmed: Vec<Message>,
    pending: Vec<PendingEntry>,
    forward: Cursor,
    reverse: Cursor,
    generation: u64,
    loading: bool,
    loading_older: bool,
    error: Option<String>,
}

impl ThreadView {
    /// Create an empty thread for the pair as it appears in the route.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            confirmed: Vec::new(),
            pending: Vec::new(),
            forward: Cursor::Start,
            reverse: Cursor::Start,
            generation: 0,
            loading: false,
            loading_older: false,
            error: None,
        }
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether either direction still has an older page.
    pub fn has_older(&self) -> bool {
        matches!(self.forward, Cursor::Next(_)) || matches!(self.reverse, Cursor::Next(_))
    }

    /// Invalidate every in-flight load.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.loading = false;
        self.loading_older = false;
    }

    /// Start (or restart) loading the newest page of both directions.
    pub fn begin_load(&mut self) -> LoadRequest {
        self.generation += 1;
        self.loading = true;
        self.loading_older = false;
        self.error = None;

        LoadRequest {
            generation: self.generation,
            forward: Some(MessageQuery::between(&self.from, &self.to)),
            reverse: Some(MessageQuery::between(&self.to, &self.from)),
        }
    }

    /// Apply the newest pages. Returns `false` when the result is stale.
    pub fn apply_first_page(
        &mut self,
        generation: u64,
        forward: MessagePage,
        reverse: MessagePage,
    ) -> bool {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "Dropping stale thread page");
            return false;
        }

        self.forward = Cursor::from_page(&forward);
        self.reverse = Cursor::from_page(&reverse);
        self.confirmed.clear();
        self.merge(forward.messages.into_iter().chain(reverse.messages));
        self.prune_listed_pending();
        self.loading = false;
        true
    }

    /// Start loading the next older page. `None` if nothing is left or a
    /// load is already running.
    pub fn begin_load_older(&mut self) -> Option<LoadRequest> {
        if self.loading || self.loading_older || !self.has_older() {
            return None;
        }

        let older = |cursor: &Cursor, from: &str, to: &str| match cursor {
            Cursor::Next(token) => {
                Some(MessageQuery::between(from, to).with_page_token(Some(token.clone())))
            }
            _ => None,
        };

        self.generation += 1;
        self.loading_older = true;

        Some(LoadRequest {
            generation: self.generation,
            forward: older(&self.forward, &self.from, &self.to),
            reverse: older(&self.reverse, &self.to, &self.from),
        })
    }

    /// Merge older pages into the thread.
    ///
    /// Returns how far the previously first visible message moved down, so a
    /// scrolled view can keep the same message under the cursor. `None` when
    /// the result is stale.
    pub fn apply_older_page(
        &mut self,
        generation: u64,
        forward: Option<MessagePage>,
        reverse: Option<MessagePage>,
    ) -> Option<usize> {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "Dropping stale older page");
            return None;
        }

        let anchor = self.visible().first().map(|m| m.sid.clone());

        let mut incoming = Vec::new();
        if let Some(page) = forward {
            self.forward = Cursor::from_page(&page);
            incoming.extend(page.messages);
        }
        if let Some(page) = reverse {
            self.reverse = Cursor::from_page(&page);
            incoming.extend(page.messages);
        }
        self.merge(incoming);
        self.prune_listed_pending();
        self.loading_older = false;

        let shift = anchor
            .and_then(|sid| self.visible().iter().position(|m| m.sid == sid))
            .unwrap_or(0);
        Some(shift)
    }

    /// Record a failed load. Stale failures are ignored.
    pub fn apply_error(&mut self, generation: u64, message: impl Into<String>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.error = Some(message.into());
        self.loading = false;
        self.loading_older = false;
        true
    }

    fn merge(&mut self, messages: impl IntoIterator<Item = Message>) {
        let mut seen: HashSet<String> = self.confirmed.iter().map(|m| m.sid.clone()).collect();
        for message in messages {
            if seen.insert(message.sid.clone()) {
                self.confirmed.push(message);
            }
        }
        sort_by_date(&mut self.confirmed);
    }

    /// Drop pending entries the provider now lists under their real sid.
    fn prune_listed_pending(&mut self) {
        let listed: HashSet<&str> = self.confirmed.iter().map(|m| m.sid.as_str()).collect();
        self.pending.retain(|p| !listed.contains(p.message.sid.as_str()));
    }

    // ── Optimistic sends ──────────────────────────────────────────────────

    /// Append a locally constructed message with status `sending`.
    pub fn begin_send(
        &mut self,
        from: &str,
        to: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> PendingId {
        let id = PendingId::new();
        let message = Message {
            sid: id.temp_sid(),
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
            status: STATUS_SENDING.to_string(),
            date: Some(now),
            direction: "outbound-api".to_string(),
            num_media: "0".to_string(),
            has_media: false,
        };
        self.pending.push(PendingEntry { id, message });
        id
    }

    /// The provider accepted the message: adopt its sid.
    pub fn confirm_send(&mut self, id: PendingId, sid: &str) -> bool {
        match self.pending.iter_mut().find(|p| p.id == id) {
            Some(entry) => {
                entry.message.sid = sid.to_string();
                entry.message.status = STATUS_QUEUED.to_string();
                self.prune_listed_pending();
                true
            }
            None => false,
        }
    }

    /// The send failed: keep the message, marked `failed`.
    pub fn fail_send(&mut self, id: PendingId) -> bool {
        match self.pending.iter_mut().find(|p| p.id == id) {
            Some(entry) => {
                entry.message.status = STATUS_FAILED.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove a pending entry, e.g. when the user retries it elsewhere.
    pub fn discard_pending(&mut self, id: PendingId) -> Option<Message> {
        let index = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(index).message)
    }

    /// Pending id of the message shown with `sid`, if it is a local entry.
    pub fn pending_id_for(&self, sid: &str) -> Option<PendingId> {
        self.pending
            .iter()
            .find(|p| p.message.sid == sid)
            .map(|p| p.id)
    }

    /// Whether any optimistic send is still waiting for the provider.
    pub fn has_sending(&self) -> bool {
        self.pending
            .iter()
            .any(|p| p.message.status == STATUS_SENDING)
    }

    /// Confirmed and pending messages, oldest first.
    pub fn visible(&self) -> Vec<Message> {
        let mut all = self.confirmed.clone();
        all.extend(self.pending.iter().map(|p| p.message.clone()));
        sort_by_date(&mut all);
        all
    }

    pub fn len(&self) -> usize {
        self.confirmed.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
