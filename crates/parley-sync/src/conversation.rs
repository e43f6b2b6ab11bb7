//! Conversation state: message store, cursor, totals and transient flags.

use parley_api::{Cursor, Message, MessagePage, Sender};
use serde::Serialize;

use crate::store::{MessageStore, Mutation, dedup_by_id};

/// Controller lifecycle for the active conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No conversation
    #[default]
    Idle,
    /// First page and channel join in flight
    Initializing,
    /// Accepting load-more, send, edit and delete
    Ready,
}

/// Snapshot of the derived view handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationView {
    pub conversation_id: Option<String>,
    pub phase: Phase,
    /// Newest-first
    pub messages: Vec<Message>,
    pub total: usize,
    /// Next page to fetch
    pub page: u32,
    pub size: u32,
    pub has_more: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub is_peer_typing: bool,
}

/// A sent message waiting for its echo from the push channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingEcho {
    pub token: u64,
    pub content: String,
}

/// Mutable state behind the controller's lock
#[derive(Debug)]
pub(crate) struct ConversationState {
    /// Bumped on every reset; async results carrying an older epoch are dropped
    pub epoch: u64,
    pub conversation_id: Option<String>,
    pub phase: Phase,
    pub store: MessageStore,
    pub cursor: Cursor,
    pub total: usize,
    pub has_more: bool,
    pub fetch_in_flight: bool,
    pub pending_ops: usize,
    pub error: Option<String>,
    pub is_peer_typing: bool,
    /// Set until the first page has been applied or has failed
    pub awaiting_first_page: bool,
    /// Pushes seen while the first page was in flight
    pub live_during_init: Vec<Message>,
    pub pending_echoes: Vec<PendingEcho>,
    next_echo_token: u64,
}

impl ConversationState {
    pub fn new(first: Cursor) -> Self {
        Self {
            epoch: 0,
            conversation_id: None,
            phase: Phase::Idle,
            store: MessageStore::new(),
            cursor: first,
            total: 0,
            has_more: true,
            fetch_in_flight: false,
            pending_ops: 0,
            error: None,
            is_peer_typing: false,
            awaiting_first_page: false,
            live_during_init: Vec::new(),
            pending_echoes: Vec::new(),
            next_echo_token: 0,
        }
    }

    /// Empty the view for a new (or no) conversation and return the new epoch.
    pub fn reset(&mut self, conversation_id: Option<String>, first: Cursor) -> u64 {
        let epoch = self.epoch + 1;
        let active = conversation_id.is_some();
        *self = Self::new(first);
        self.epoch = epoch;
        self.conversation_id = conversation_id;
        self.phase = if active { Phase::Initializing } else { Phase::Idle };
        self.awaiting_first_page = active;
        epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    pub fn is_loading(&self) -> bool {
        self.pending_ops > 0
    }

    pub fn begin_op(&mut self) {
        self.pending_ops += 1;
        self.error = None;
    }

    pub fn end_op(&mut self) {
        self.pending_ops = self.pending_ops.saturating_sub(1);
    }

    /// Install the first page, then re-apply pushes that raced it.
    pub fn apply_first_page(&mut self, page: MessagePage, cursor: Cursor) {
        let fetched = page.messages.len();
        self.store
            .dispatch(Mutation::Replace(dedup_by_id(page.messages)));
        self.total = page.total;
        for message in std::mem::take(&mut self.live_during_init) {
            if !self.store.contains(&message.id) {
                self.store.dispatch(Mutation::AppendNewest(message));
                self.total += 1;
            }
        }
        self.awaiting_first_page = false;
        self.advance(cursor, fetched);
    }

    /// Merge an older page behind the current list.
    pub fn apply_older_page(&mut self, page: MessagePage, cursor: Cursor) {
        let fetched = page.messages.len();
        self.store.dispatch(Mutation::AppendOlder(page.messages));
        self.total = page.total;
        self.advance(cursor, fetched);
    }

    /// Move past `cursor` and recompute `has_more` from the merged store.
    fn advance(&mut self, cursor: Cursor, fetched: usize) {
        self.cursor = cursor.next();
        self.has_more = fetched > 0 && self.store.len() < self.total;
    }

    /// Apply a pushed message. Redelivery of a known id updates it in place.
    pub fn apply_incoming(&mut self, message: Message) {
        if self.awaiting_first_page {
            self.live_during_init.push(message.clone());
        }
        if self.store.contains(&message.id) {
            self.store.dispatch(Mutation::UpdateById(message));
        } else {
            // Only a first delivery can be the echo of a pending send
            if message.sender == Sender::User {
                self.confirm_echo(&message.content);
            }
            self.store.dispatch(Mutation::AppendNewest(message));
            self.total += 1;
        }
    }

    /// Adopt a server-confirmed edit, including any copy buffered during init.
    pub fn apply_edited(&mut self, message: Message) {
        for buffered in self.live_during_init.iter_mut().filter(|m| m.id == message.id) {
            *buffered = message.clone();
        }
        self.store.dispatch(Mutation::UpdateById(message));
    }

    /// Drop a server-deleted message and shrink the total.
    pub fn apply_removed(&mut self, message_id: &str) {
        self.live_during_init.retain(|m| m.id != message_id);
        self.store
            .dispatch(Mutation::RemoveById(message_id.to_string()));
        self.total = self.total.saturating_sub(1);
        self.has_more = self.has_more && self.store.len() < self.total;
    }

    pub fn register_echo(&mut self, content: &str) -> u64 {
        self.next_echo_token += 1;
        let token = self.next_echo_token;
        self.pending_echoes.push(PendingEcho {
            token,
            content: content.trim().to_string(),
        });
        token
    }

    fn confirm_echo(&mut self, content: &str) {
        let content = content.trim();
        if let Some(pos) = self.pending_echoes.iter().position(|p| p.content == content) {
            self.pending_echoes.remove(pos);
        }
    }

    /// Drop a pending echo; true if it was still outstanding.
    pub fn expire_echo(&mut self, token: u64) -> bool {
        match self.pending_echoes.iter().position(|p| p.token == token) {
            Some(pos) => {
                self.pending_echoes.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn view(&self) -> ConversationView {
        ConversationView {
            conversation_id: self.conversation_id.clone(),
            phase: self.phase,
            messages: self.store.as_slice().to_vec(),
            total: self.total,
            page: self.cursor.page(),
            size: self.cursor.size(),
            has_more: self.has_more,
            is_loading: self.is_loading(),
            error: self.error.clone(),
            is_peer_typing: self.is_peer_typing,
        }
    }
}
