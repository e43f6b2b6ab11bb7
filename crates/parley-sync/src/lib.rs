//! parley-sync: message synchronization core
//!
//! Keeps a conversation's timeline consistent across paginated history,
//! the real-time push channel and server-confirmed edits.

pub mod channel;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod events;
pub mod history;
pub mod session;
pub mod store;
pub mod ws;

pub use channel::{ChannelState, RealtimeChannel, ReconnectConfig, Subscribers};
pub use controller::{SyncConfig, SyncController};
pub use conversation::{ConversationView, Phase};
pub use error::{Error, Result};
pub use events::SyncEvent;
pub use history::{HistoryBackend, MessageEditor, PaginationFetcher};
pub use session::{
    ConversationApi, PersistedSession, Session, bootstrap_session, start_new_conversation,
};
pub use store::{MessageStore, Mutation};
pub use ws::WsChannel;
