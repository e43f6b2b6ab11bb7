//! Sync event types

use parley_api::Message;
use serde::{Deserialize, Serialize};

use crate::channel::ChannelState;

/// Events emitted by the sync controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// The active conversation changed (or was cleared); the view was reset
    ConversationChanged { conversation_id: Option<String> },

    /// First page and channel setup finished for the active conversation
    Ready { conversation_id: String },

    /// The message list, total or cursor changed
    MessagesChanged { len: usize, total: usize, has_more: bool },

    /// A message arrived over the push channel
    MessageReceived { message: Message },

    /// Peer typing indicator changed
    PeerTyping { is_typing: bool },

    /// Push channel changed state
    ChannelStatus { state: ChannelState },

    /// An operation failed; `message` is what the UI should show
    Error { message: String },
}

impl SyncEvent {
    /// Check if this event carries an error
    pub fn is_error(&self) -> bool {
        matches!(self, SyncEvent::Error { .. })
    }
}
