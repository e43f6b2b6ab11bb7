//! Push channel abstraction

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use parley_api::{Message, Result, TypingEvent};
use serde::{Deserialize, Serialize};

/// Connection state of a push channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

pub type MessageCallback = Arc<dyn Fn(Message) + Send + Sync>;
pub type TypingCallback = Arc<dyn Fn(TypingEvent) + Send + Sync>;
pub type StatusCallback = Arc<dyn Fn(ChannelState) + Send + Sync>;

/// A persistent bidirectional channel bound to at most one conversation room.
///
/// Each `on_*` registration replaces the previous subscriber for that event
/// kind; there is never more than one listener per kind.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Open the physical connection. Calling again replaces the prior connection.
    async fn connect(&self, conversation_id: &str) -> Result<()>;

    /// Close the connection. Never reconnects afterwards.
    async fn disconnect(&self);

    /// Join a room, leaving any other room first. Joining the current room is a no-op.
    async fn join(&self, conversation_id: &str) -> Result<()>;

    /// Leave the current room, if any
    async fn leave(&self) -> Result<()>;

    /// Publish a new message into the joined room. No delivery acknowledgment.
    async fn send(&self, content: &str) -> Result<()>;

    /// Best-effort local typing signal
    async fn emit_typing(&self, is_typing: bool) -> Result<()>;

    fn on_incoming_message(&self, callback: MessageCallback);

    fn on_typing(&self, callback: TypingCallback);

    fn on_status(&self, callback: StatusCallback);

    fn state(&self) -> ChannelState;

    /// Currently joined room
    fn room(&self) -> Option<String>;
}

/// Single-slot subscribers, one per event kind.
///
/// Callbacks are cloned out of their slot before being invoked, so a callback
/// may re-register without deadlocking.
#[derive(Default)]
pub struct Subscribers {
    message: Mutex<Option<MessageCallback>>,
    typing: Mutex<Option<TypingCallback>>,
    status: Mutex<Option<StatusCallback>>,
}

impl Subscribers {
    pub fn set_message(&self, callback: MessageCallback) {
        *self.message.lock() = Some(callback);
    }

    pub fn set_typing(&self, callback: TypingCallback) {
        *self.typing.lock() = Some(callback);
    }

    pub fn set_status(&self, callback: StatusCallback) {
        *self.status.lock() = Some(callback);
    }

    pub fn emit_message(&self, message: Message) {
        let callback = self.message.lock().clone();
        match callback {
            Some(cb) => cb(message),
            None => tracing::debug!("No message subscriber, dropping message {}", message.id),
        }
    }

    pub fn emit_typing(&self, event: TypingEvent) {
        let callback = self.typing.lock().clone();
        if let Some(cb) = callback {
            cb(event);
        }
    }

    pub fn emit_status(&self, state: ChannelState) {
        let callback = self.status.lock().clone();
        if let Some(cb) = callback {
            cb(state);
        }
    }
}

/// Reconnection policy for a push channel
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Reconnect after an unexpected drop
    pub auto_reconnect: bool,
    /// Maximum number of retry attempts per connection attempt
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// No retries, no automatic reconnect
    pub fn disabled() -> Self {
        Self {
            auto_reconnect: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}
