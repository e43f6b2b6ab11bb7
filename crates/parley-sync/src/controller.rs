//! Sync controller: owns the active conversation and drives history and push

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::Mutex;
use parley_api::{Cursor, Message, TypingEvent};
use tokio::sync::broadcast;
use tokio_stream::{
    Stream, StreamExt,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};

use crate::{
    channel::{ChannelState, RealtimeChannel},
    conversation::{ConversationState, ConversationView, Phase},
    error::{Error, Result},
    events::SyncEvent,
    history::HistoryBackend,
};

pub const LOAD_FAILED: &str = "Failed to load messages.";
pub const SEND_FAILED: &str = "Failed to send message.";
pub const UPDATE_FAILED: &str = "Failed to update message.";
pub const DELETE_FAILED: &str = "Failed to delete message.";
pub const CONNECT_FAILED: &str = "Failed to connect to chat.";
pub const NOT_DELIVERED: &str = "Message was not delivered.";

/// Controller configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Messages per history page
    pub page_size: u32,
    /// How long a sent message may go without its push echo.
    /// `None` disables the check.
    pub echo_timeout: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 15,
            echo_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Keeps one conversation's timeline in sync across history fetches,
/// pushed messages and local edits.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct SyncController {
    shared: Arc<Shared>,
}

struct Shared {
    config: SyncConfig,
    first_page: Cursor,
    history: Arc<dyn HistoryBackend>,
    channel: Arc<dyn RealtimeChannel>,
    state: Mutex<ConversationState>,
    /// Serializes channel teardown and setup across conversation switches
    switch: tokio::sync::Mutex<()>,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl SyncController {
    /// Create a controller with no active conversation
    pub fn new(
        config: SyncConfig,
        history: Arc<dyn HistoryBackend>,
        channel: Arc<dyn RealtimeChannel>,
    ) -> Result<Self> {
        let first_page = Cursor::first(config.page_size)?;
        let (event_tx, _) = broadcast::channel(256);
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                first_page,
                history,
                channel,
                state: Mutex::new(ConversationState::new(first_page)),
                switch: tokio::sync::Mutex::new(()),
                event_tx,
            }),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.shared.config
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Controller events as a stream. Lagged receivers skip ahead.
    pub fn event_stream(&self) -> impl Stream<Item = SyncEvent> + Send + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("Sync event stream lagged, skipped {} events", skipped);
                None
            }
        })
    }

    /// Snapshot of the current view
    pub fn view(&self) -> ConversationView {
        self.shared.state.lock().view()
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.shared.state.lock().conversation_id.clone()
    }

    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    /// Switch to `conversation_id`, or to no conversation with `None`.
    ///
    /// The view is reset and the previous room released before anything for
    /// the new conversation is requested. The first page and the channel join
    /// run concurrently. Setting the current conversation again does nothing.
    pub async fn set_conversation(&self, conversation_id: Option<String>) -> Result<()> {
        let shared = &self.shared;
        let switch = shared.switch.lock().await;

        let (epoch, previous) = {
            let mut state = shared.state.lock();
            if state.conversation_id == conversation_id {
                return Ok(());
            }
            let previous = state.conversation_id.clone();
            let epoch = state.reset(conversation_id.clone(), shared.first_page);
            if conversation_id.is_some() {
                state.fetch_in_flight = true;
                state.begin_op();
            }
            shared.emit(SyncEvent::ConversationChanged {
                conversation_id: conversation_id.clone(),
            });
            shared.messages_changed(&state);
            (epoch, previous)
        };

        if let Some(previous) = previous {
            tracing::info!("Leaving conversation {}", previous);
            self.teardown().await;
        }

        let Some(id) = conversation_id else {
            return Ok(());
        };
        tracing::info!("Opening conversation {}", id);

        let id_ref = id.as_str();
        let (fetched, opened) = tokio::join!(self.load_first_page(epoch, id_ref), async move {
            let opened = self.open_channel(epoch, id_ref).await;
            drop(switch);
            opened
        });

        {
            let mut state = shared.state.lock();
            if !state.is_current(epoch) {
                tracing::debug!("Conversation {} was replaced during setup", id);
                return Ok(());
            }
            state.end_op();
            state.phase = Phase::Ready;
        }
        shared.emit(SyncEvent::Ready {
            conversation_id: id,
        });
        fetched.and(opened)
    }

    /// Drop the active conversation and return to an empty view
    pub async fn clear(&self) -> Result<()> {
        self.set_conversation(None).await
    }

    /// Clear the conversation and release the channel
    pub async fn close(&self) {
        let _switch = self.shared.switch.lock().await;
        {
            let mut state = self.shared.state.lock();
            if state.conversation_id.is_some() {
                state.reset(None, self.shared.first_page);
                self.shared
                    .emit(SyncEvent::ConversationChanged { conversation_id: None });
            }
        }
        self.teardown().await;
    }

    /// Fetch the next older page. Does nothing when every message is loaded,
    /// a fetch is already running, or there is no conversation.
    pub async fn load_more_messages(&self) -> Result<()> {
        let (epoch, id, cursor) = {
            let mut state = self.shared.state.lock();
            let Some(id) = state.conversation_id.clone() else {
                return Ok(());
            };
            if !state.has_more || state.fetch_in_flight {
                return Ok(());
            }
            state.fetch_in_flight = true;
            state.begin_op();
            (state.epoch, id, state.cursor)
        };

        tracing::debug!("Fetching page {} of {}", cursor.page(), id);
        let result = self.shared.history.fetch_page(&id, cursor).await;

        let mut state = self.shared.state.lock();
        if !state.is_current(epoch) {
            tracing::debug!("Discarding page {} of {}", cursor.page(), id);
            return Ok(());
        }
        state.fetch_in_flight = false;
        state.end_op();
        match result {
            Ok(page) => {
                state.apply_older_page(page, cursor);
                self.shared.messages_changed(&state);
                Ok(())
            }
            Err(e) => {
                self.shared.fail(&mut state, LOAD_FAILED, &e);
                Err(e.into())
            }
        }
    }

    /// Publish a user message into the active room.
    ///
    /// Nothing is appended locally; the message shows up when the channel
    /// echoes it back.
    pub async fn send_user_message(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(Error::Validation("message content is empty".into()));
        }
        let (epoch, echo) = {
            let mut state = self.shared.state.lock();
            if state.conversation_id.is_none() {
                return Err(Error::NoConversation);
            }
            state.begin_op();
            let echo = self
                .shared
                .config
                .echo_timeout
                .map(|timeout| (state.register_echo(content), timeout));
            (state.epoch, echo)
        };

        let result = self.shared.channel.send(content).await;

        {
            let mut state = self.shared.state.lock();
            if !state.is_current(epoch) {
                return result.map_err(Error::from);
            }
            state.end_op();
            if let Err(e) = result {
                if let Some((token, _)) = echo {
                    state.expire_echo(token);
                }
                self.shared.fail(&mut state, SEND_FAILED, &e);
                return Err(e.into());
            }
        }

        if let Some((token, timeout)) = echo {
            self.watch_echo(epoch, token, timeout);
        }
        Ok(())
    }

    /// Update a message on the server and adopt its canonical version
    pub async fn edit_message(&self, message_id: &str, content: &str) -> Result<Message> {
        if content.trim().is_empty() {
            return Err(Error::Validation("message content is empty".into()));
        }
        let (epoch, id) = self.begin_request()?;
        let result = self
            .shared
            .history
            .update_message(&id, message_id, content)
            .await;

        let mut state = self.shared.state.lock();
        if !state.is_current(epoch) {
            tracing::debug!("Discarding edit of {} in {}", message_id, id);
            return result.map_err(Error::from);
        }
        state.end_op();
        match result {
            Ok(message) => {
                state.apply_edited(message.clone());
                self.shared.messages_changed(&state);
                Ok(message)
            }
            Err(e) => {
                self.shared.fail(&mut state, UPDATE_FAILED, &e);
                Err(e.into())
            }
        }
    }

    /// Delete a message on the server, then locally
    pub async fn remove_message(&self, message_id: &str) -> Result<()> {
        let (epoch, id) = self.begin_request()?;
        let result = self.shared.history.delete_message(&id, message_id).await;

        let mut state = self.shared.state.lock();
        if !state.is_current(epoch) {
            tracing::debug!("Discarding delete of {} in {}", message_id, id);
            return result.map_err(Error::from);
        }
        state.end_op();
        match result {
            Ok(()) => {
                state.apply_removed(message_id);
                self.shared.messages_changed(&state);
                Ok(())
            }
            Err(e) => {
                self.shared.fail(&mut state, DELETE_FAILED, &e);
                Err(e.into())
            }
        }
    }

    /// Tell the peer whether the local user is typing. Failures are not
    /// shown in the view.
    pub async fn emit_typing(&self, is_typing: bool) -> Result<()> {
        if self.shared.state.lock().conversation_id.is_none() {
            return Err(Error::NoConversation);
        }
        self.shared
            .channel
            .emit_typing(is_typing)
            .await
            .map_err(|e| {
                tracing::debug!("Typing signal dropped: {}", e);
                e.into()
            })
    }

    fn begin_request(&self) -> Result<(u64, String)> {
        let mut state = self.shared.state.lock();
        let id = state.conversation_id.clone().ok_or(Error::NoConversation)?;
        state.begin_op();
        Ok((state.epoch, id))
    }

    async fn load_first_page(&self, epoch: u64, id: &str) -> Result<()> {
        let cursor = self.shared.first_page;
        let result = self.shared.history.fetch_page(id, cursor).await;

        let mut state = self.shared.state.lock();
        if !state.is_current(epoch) {
            tracing::debug!("Discarding first page of {}", id);
            return Ok(());
        }
        state.fetch_in_flight = false;
        match result {
            Ok(page) => {
                tracing::debug!(
                    "Loaded {} of {} messages for {}",
                    page.messages.len(),
                    page.total,
                    id
                );
                state.apply_first_page(page, cursor);
                self.shared.messages_changed(&state);
                Ok(())
            }
            Err(e) => {
                state.awaiting_first_page = false;
                state.live_during_init.clear();
                self.shared.fail(&mut state, LOAD_FAILED, &e);
                Err(e.into())
            }
        }
    }

    async fn open_channel(&self, epoch: u64, id: &str) -> Result<()> {
        self.subscribe_channel(epoch);
        let channel = &self.shared.channel;
        let result = match channel.connect(id).await {
            Ok(()) => channel.join(id).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!("Joined conversation {}", id);
                Ok(())
            }
            Err(e) => {
                let mut state = self.shared.state.lock();
                if state.is_current(epoch) {
                    self.shared.fail(&mut state, CONNECT_FAILED, &e);
                }
                Err(e.into())
            }
        }
    }

    /// Route channel callbacks into this controller, tagged with `epoch`.
    fn subscribe_channel(&self, epoch: u64) {
        let channel = &self.shared.channel;

        let weak = Arc::downgrade(&self.shared);
        channel.on_incoming_message(Arc::new(move |message| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_incoming(epoch, message);
            }
        }));

        let weak = Arc::downgrade(&self.shared);
        channel.on_typing(Arc::new(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_typing(epoch, event);
            }
        }));

        let weak = Arc::downgrade(&self.shared);
        channel.on_status(Arc::new(move |status| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_status(epoch, status);
            }
        }));
    }

    async fn teardown(&self) {
        if let Err(e) = self.shared.channel.leave().await {
            tracing::debug!("Leave failed during teardown: {}", e);
        }
        self.shared.channel.disconnect().await;
    }

    fn watch_echo(&self, epoch: u64, token: u64, timeout: Duration) {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut state = shared.state.lock();
            if state.is_current(epoch) && state.expire_echo(token) {
                shared.fail(
                    &mut state,
                    NOT_DELIVERED,
                    format!("no echo within {:?}", timeout),
                );
            }
        });
    }
}

impl Shared {
    fn emit(&self, event: SyncEvent) {
        let _ = self.event_tx.send(event);
    }

    fn messages_changed(&self, state: &ConversationState) {
        self.emit(SyncEvent::MessagesChanged {
            len: state.store.len(),
            total: state.total,
            has_more: state.has_more,
        });
    }

    /// Record a failure in the view of the conversation it belongs to.
    fn fail(&self, state: &mut ConversationState, message: &str, cause: impl std::fmt::Display) {
        tracing::warn!("{} ({})", message, cause);
        state.error = Some(message.to_string());
        self.emit(SyncEvent::Error {
            message: message.to_string(),
        });
    }

    fn handle_incoming(&self, epoch: u64, message: Message) {
        let mut state = self.state.lock();
        if !state.is_current(epoch) {
            tracing::debug!("Ignoring message {} for a previous conversation", message.id);
            return;
        }
        state.apply_incoming(message.clone());
        self.emit(SyncEvent::MessageReceived { message });
        self.messages_changed(&state);
    }

    fn handle_typing(&self, epoch: u64, event: TypingEvent) {
        let mut state = self.state.lock();
        if !state.is_current(epoch) || state.is_peer_typing == event.is_typing {
            return;
        }
        state.is_peer_typing = event.is_typing;
        self.emit(SyncEvent::PeerTyping {
            is_typing: event.is_typing,
        });
    }

    fn handle_status(&self, epoch: u64, status: ChannelState) {
        let mut state = self.state.lock();
        if !state.is_current(epoch) {
            return;
        }
        self.emit(SyncEvent::ChannelStatus { state: status });
        if status == ChannelState::Disconnected && state.is_peer_typing {
            state.is_peer_typing = false;
            self.emit(SyncEvent::PeerTyping { is_typing: false });
        }
    }
}
