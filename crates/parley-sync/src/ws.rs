//! WebSocket implementation of [`RealtimeChannel`]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use parley_api::{ClientEvent, Error, Result, ServerEvent, Url};
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as Frame,
};
use tokio_util::sync::CancellationToken;

use crate::channel::{
    ChannelState, MessageCallback, RealtimeChannel, ReconnectConfig, StatusCallback, Subscribers,
    TypingCallback,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long `disconnect` waits for the connection task to flush and close
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Push channel over a single WebSocket connection.
///
/// A background task owns the socket: it writes queued [`ClientEvent`]s and
/// dispatches incoming [`ServerEvent`]s to the registered subscribers.
pub struct WsChannel {
    url: Url,
    reconnect: ReconnectConfig,
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Link {
    /// Bumped whenever the connection is replaced or torn down; a task only
    /// touches the link while its generation is current.
    generation: u64,
    state: ChannelState,
    room: Option<String>,
    outbound: Option<mpsc::UnboundedSender<ClientEvent>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

struct Detached {
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
    was: ChannelState,
}

#[derive(Default)]
struct Shared {
    link: Mutex<Link>,
    subscribers: Subscribers,
}

impl Shared {
    /// Returns false if `generation` has been superseded.
    fn set_state(&self, generation: u64, state: ChannelState) -> bool {
        let changed = {
            let mut link = self.link.lock();
            if link.generation != generation {
                return false;
            }
            let changed = link.state != state;
            link.state = state;
            changed
        };
        if changed {
            self.subscribers.emit_status(state);
        }
        true
    }

    /// Forget the connection after a drop that will not be retried.
    fn release(&self, generation: u64) {
        let mut link = self.link.lock();
        if link.generation == generation {
            link.outbound = None;
            link.room = None;
            link.cancel = None;
            link.task = None;
        }
    }

    fn room_for(&self, generation: u64) -> Option<String> {
        let link = self.link.lock();
        if link.generation == generation {
            link.room.clone()
        } else {
            None
        }
    }

    fn dispatch(&self, frame: &str) {
        match ServerEvent::parse(frame) {
            Ok(ServerEvent::NewMessage(message)) => {
                tracing::debug!("<- new_message {}", message.id);
                self.subscribers.emit_message(message);
            }
            Ok(ServerEvent::Typing(event)) => {
                tracing::debug!("<- typing {}", event.is_typing);
                self.subscribers.emit_typing(event);
            }
            Err(e) => tracing::debug!("Ignoring unrecognized channel frame: {}", e),
        }
    }
}

impl WsChannel {
    /// Create a channel for `url`. `http(s)` URLs are mapped to `ws(s)`.
    pub fn new(url: &str, reconnect: ReconnectConfig) -> Result<Self> {
        let mut parsed = Url::parse(url)
            .map_err(|e| Error::InvalidConfig(format!("invalid socket URL '{}': {}", url, e)))?;
        let scheme = match parsed.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => {
                return Err(Error::InvalidConfig(format!(
                    "socket URL must use ws://, wss://, http:// or https://, got {}://",
                    other
                )));
            }
        };
        if parsed.scheme() != scheme && parsed.set_scheme(scheme).is_err() {
            return Err(Error::InvalidConfig(format!("cannot use {} as a socket URL", url)));
        }
        Ok(Self {
            url: parsed,
            reconnect,
            shared: Arc::new(Shared::default()),
        })
    }

    fn socket_url(&self, conversation_id: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("conversation_id", conversation_id);
        url
    }

    /// Invalidate the current connection and hand back what is needed to stop it.
    fn detach(&self) -> Detached {
        let mut link = self.shared.link.lock();
        link.generation += 1;
        let was = link.state;
        link.state = ChannelState::Disconnected;
        link.room = None;
        // Queued frames stay readable by the task until it drains them.
        link.outbound = None;
        Detached {
            cancel: link.cancel.take(),
            task: link.task.take(),
            was,
        }
    }

    async fn shutdown(&self, detached: Detached) {
        if let Some(cancel) = detached.cancel {
            cancel.cancel();
        }
        if let Some(task) = detached.task {
            let abort = task.abort_handle();
            if tokio::time::timeout(CLOSE_TIMEOUT, task).await.is_err() {
                tracing::warn!("Channel task did not stop within {:?}, aborting", CLOSE_TIMEOUT);
                abort.abort();
            }
        }
        if detached.was != ChannelState::Disconnected {
            self.shared.subscribers.emit_status(ChannelState::Disconnected);
        }
    }

    /// Queue events built from the link state. Fails unless connected.
    fn enqueue(&self, build: impl FnOnce(&mut Link) -> Result<Vec<ClientEvent>>) -> Result<()> {
        let (tx, events) = {
            let mut link = self.shared.link.lock();
            if link.state != ChannelState::Connected {
                return Err(Error::NotConnected);
            }
            let tx = link.outbound.clone().ok_or(Error::NotConnected)?;
            let events = build(&mut link)?;
            (tx, events)
        };
        for event in events {
            tx.send(event).map_err(|_| Error::NotConnected)?;
        }
        Ok(())
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        if let Some(cancel) = self.shared.link.lock().cancel.take() {
            cancel.cancel();
        }
    }
}

#[async_trait]
impl RealtimeChannel for WsChannel {
    async fn connect(&self, conversation_id: &str) -> Result<()> {
        let previous = self.detach();
        self.shutdown(previous).await;

        let cancel = CancellationToken::new();
        let generation = {
            let mut link = self.shared.link.lock();
            link.state = ChannelState::Connecting;
            link.cancel = Some(cancel.clone());
            link.generation
        };
        self.shared.subscribers.emit_status(ChannelState::Connecting);

        let url = self.socket_url(conversation_id);
        let socket = match open_socket(&url, &self.reconnect, &cancel).await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::warn!("Channel connect failed for conversation {}: {}", conversation_id, e);
                self.shared.set_state(generation, ChannelState::Disconnected);
                self.shared.release(generation);
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut link = self.shared.link.lock();
            if link.generation != generation {
                return Err(Error::NotConnected);
            }
            link.outbound = Some(tx);
        }
        self.shared.set_state(generation, ChannelState::Connected);

        let task = tokio::spawn(run_link(
            Arc::clone(&self.shared),
            socket,
            rx,
            cancel,
            generation,
            url,
            self.reconnect.clone(),
        ));
        {
            let mut link = self.shared.link.lock();
            if link.generation == generation {
                link.task = Some(task);
            }
        }
        tracing::info!("Channel connected for conversation {}", conversation_id);
        Ok(())
    }

    async fn disconnect(&self) {
        let detached = self.detach();
        let had_connection = detached.cancel.is_some();
        self.shutdown(detached).await;
        if had_connection {
            tracing::info!("Channel disconnected");
        }
    }

    async fn join(&self, conversation_id: &str) -> Result<()> {
        self.enqueue(|link| {
            if link.room.as_deref() == Some(conversation_id) {
                return Ok(vec![]);
            }
            let mut events = Vec::with_capacity(2);
            if let Some(old) = link.room.replace(conversation_id.to_string()) {
                events.push(ClientEvent::LeaveConversation {
                    conversation_id: old,
                });
            }
            events.push(ClientEvent::JoinConversation {
                conversation_id: conversation_id.to_string(),
            });
            Ok(events)
        })
    }

    async fn leave(&self) -> Result<()> {
        if self.shared.link.lock().room.is_none() {
            return Ok(());
        }
        self.enqueue(|link| {
            Ok(link
                .room
                .take()
                .map(|conversation_id| ClientEvent::LeaveConversation { conversation_id })
                .into_iter()
                .collect())
        })
    }

    async fn send(&self, content: &str) -> Result<()> {
        self.enqueue(|link| {
            let conversation_id = link.room.clone().ok_or(Error::NotJoined)?;
            Ok(vec![ClientEvent::SendMessage {
                conversation_id,
                content: content.to_string(),
            }])
        })
    }

    async fn emit_typing(&self, is_typing: bool) -> Result<()> {
        self.enqueue(|link| {
            let conversation_id = link.room.clone().ok_or(Error::NotJoined)?;
            Ok(vec![ClientEvent::Typing {
                conversation_id,
                is_typing,
            }])
        })
    }

    fn on_incoming_message(&self, callback: MessageCallback) {
        self.shared.subscribers.set_message(callback);
    }

    fn on_typing(&self, callback: TypingCallback) {
        self.shared.subscribers.set_typing(callback);
    }

    fn on_status(&self, callback: StatusCallback) {
        self.shared.subscribers.set_status(callback);
    }

    fn state(&self) -> ChannelState {
        self.shared.link.lock().state
    }

    fn room(&self) -> Option<String> {
        self.shared.link.lock().room.clone()
    }
}

/// Open a socket, retrying retryable failures per `reconnect`
async fn open_socket(
    url: &Url,
    reconnect: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Result<Socket> {
    let mut attempt = 0u32;
    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::NotConnected),
            r = connect_async(url.as_str()) => r,
        };
        match result {
            Ok((socket, _)) => return Ok(socket),
            Err(e) => {
                let error = Error::from(e);
                if attempt < reconnect.max_retries && error.is_retryable() {
                    let delay = reconnect.delay_for_attempt(attempt);
                    tracing::warn!(
                        "Channel connect failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt + 1,
                        reconnect.max_retries + 1,
                        error,
                        delay
                    );
                    attempt += 1;
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(Error::NotConnected),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }
                return Err(error);
            }
        }
    }
}

async fn send_event(socket: &mut Socket, event: &ClientEvent) -> Result<()> {
    let frame = event.to_frame()?;
    tracing::debug!("-> {}", event.name());
    socket.send(Frame::text(frame)).await?;
    Ok(())
}

enum LinkEnd {
    Cancelled,
    Dropped(String),
}

async fn pump(
    shared: &Shared,
    socket: &mut Socket,
    outbound: &mut mpsc::UnboundedReceiver<ClientEvent>,
    cancel: &CancellationToken,
) -> LinkEnd {
    loop {
        tokio::select! {
            biased;
            Some(event) = outbound.recv() => {
                if let Err(e) = send_event(socket, &event).await {
                    return LinkEnd::Dropped(e.to_string());
                }
            }
            _ = cancel.cancelled() => return LinkEnd::Cancelled,
            incoming = socket.next() => match incoming {
                Some(Ok(Frame::Text(text))) => shared.dispatch(&text),
                Some(Ok(Frame::Close(_))) | None => {
                    return LinkEnd::Dropped("closed by server".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return LinkEnd::Dropped(e.to_string()),
            }
        }
    }
}

/// Connection task: pump frames, and reconnect after unexpected drops if allowed.
async fn run_link(
    shared: Arc<Shared>,
    mut socket: Socket,
    mut outbound: mpsc::UnboundedReceiver<ClientEvent>,
    cancel: CancellationToken,
    generation: u64,
    url: Url,
    reconnect: ReconnectConfig,
) {
    loop {
        match pump(&shared, &mut socket, &mut outbound, &cancel).await {
            LinkEnd::Cancelled => {
                // Flush what was queued before the teardown (typically a leave).
                while let Ok(event) = outbound.try_recv() {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                let _ = socket.close(None).await;
                return;
            }
            LinkEnd::Dropped(reason) => {
                tracing::warn!("Channel connection dropped: {}", reason);
                if !shared.set_state(generation, ChannelState::Disconnected) {
                    return;
                }
                if !reconnect.auto_reconnect {
                    shared.release(generation);
                    return;
                }
                shared.set_state(generation, ChannelState::Connecting);
                match open_socket(&url, &reconnect, &cancel).await {
                    Ok(fresh) => {
                        socket = fresh;
                        if let Some(room) = shared.room_for(generation) {
                            let rejoin = ClientEvent::JoinConversation {
                                conversation_id: room,
                            };
                            if let Err(e) = send_event(&mut socket, &rejoin).await {
                                tracing::warn!("Failed to rejoin after reconnect: {}", e);
                            }
                        }
                        if !shared.set_state(generation, ChannelState::Connected) {
                            let _ = socket.close(None).await;
                            return;
                        }
                        tracing::info!("Channel reconnected");
                    }
                    Err(e) => {
                        tracing::warn!("Channel reconnect failed: {}", e);
                        shared.set_state(generation, ChannelState::Disconnected);
                        shared.release(generation);
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_api::{Message, Sender};
    use serde_json::Value;
    use tokio::net::TcpListener;
    use tokio_tungstenite::{
        accept_async, accept_hdr_async,
        tungstenite::handshake::server::{ErrorResponse, Request, Response},
    };

    const WAIT: Duration = Duration::from_secs(5);

    /// One-connection test server. Frames received from the client are
    /// forwarded to `seen`; strings sent on `push` go to the client. Dropping
    /// `push` closes the connection.
    struct TestServer {
        url: String,
        seen: mpsc::UnboundedReceiver<Value>,
        push: Option<mpsc::UnboundedSender<String>>,
        request_uri: mpsc::UnboundedReceiver<String>,
    }

    async fn spawn_server() -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (seen_tx, seen) = mpsc::unbounded_channel();
        let (push, mut push_rx) = mpsc::unbounded_channel::<String>();
        let (uri_tx, request_uri) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = accept_hdr_async(
                tcp,
                move |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
                    let _ = uri_tx.send(req.uri().to_string());
                    Ok(resp)
                },
            )
            .await
            .unwrap();
            let (mut sink, mut source) = ws.split();
            loop {
                tokio::select! {
                    frame = source.next() => match frame {
                        Some(Ok(Frame::Text(text))) => {
                            let _ = seen_tx.send(serde_json::from_str::<Value>(&text).unwrap());
                        }
                        Some(Ok(_)) => {}
                        _ => break,
                    },
                    out = push_rx.recv() => match out {
                        Some(text) => {
                            if sink.send(Frame::text(text)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        TestServer {
            url: format!("ws://{}", addr),
            seen,
            push: Some(push),
            request_uri,
        }
    }

    async fn next_frame(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("server gone")
    }

    async fn wait_for_state(channel: &WsChannel, state: ChannelState) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while channel.state() != state {
            assert!(tokio::time::Instant::now() < deadline, "channel never reached {:?}", state);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[test]
    fn test_new_maps_http_schemes() {
        let ch = WsChannel::new("https://chat.example.com/socket", ReconnectConfig::disabled()).unwrap();
        assert_eq!(ch.url.scheme(), "wss");
        let ch = WsChannel::new("http://localhost:3000", ReconnectConfig::disabled()).unwrap();
        assert_eq!(ch.url.scheme(), "ws");
        assert!(WsChannel::new("ftp://example.com", ReconnectConfig::disabled()).is_err());
    }

    #[tokio::test]
    async fn test_connect_join_passes_conversation_id() {
        let mut server = spawn_server().await;
        let channel = WsChannel::new(&server.url, ReconnectConfig::disabled()).unwrap();

        channel.connect("c1").await.unwrap();
        assert_eq!(channel.state(), ChannelState::Connected);
        let uri = tokio::time::timeout(WAIT, server.request_uri.recv()).await.unwrap().unwrap();
        assert!(uri.contains("conversation_id=c1"), "uri: {}", uri);

        channel.join("c1").await.unwrap();
        assert_eq!(channel.room().as_deref(), Some("c1"));
        let frame = next_frame(&mut server.seen).await;
        assert_eq!(frame["event"], "join_conversation");
        assert_eq!(frame["data"]["conversationId"], "c1");
    }

    #[tokio::test]
    async fn test_join_other_room_leaves_first_and_same_room_is_noop() {
        let mut server = spawn_server().await;
        let channel = WsChannel::new(&server.url, ReconnectConfig::disabled()).unwrap();
        channel.connect("c1").await.unwrap();

        channel.join("c1").await.unwrap();
        channel.join("c1").await.unwrap();
        channel.join("c2").await.unwrap();
        channel.send("hello").await.unwrap();

        let events: Vec<(String, String)> = {
            let mut out = vec![];
            for _ in 0..4 {
                let f = next_frame(&mut server.seen).await;
                out.push((
                    f["event"].as_str().unwrap().to_string(),
                    f["data"]["conversationId"].as_str().unwrap().to_string(),
                ));
            }
            out
        };
        assert_eq!(
            events,
            vec![
                ("join_conversation".to_string(), "c1".to_string()),
                ("leave_conversation".to_string(), "c1".to_string()),
                ("join_conversation".to_string(), "c2".to_string()),
                ("send_message".to_string(), "c2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let channel = WsChannel::new("ws://127.0.0.1:9", ReconnectConfig::disabled()).unwrap();
        assert!(matches!(channel.send("x").await, Err(Error::NotConnected)));
        assert!(matches!(channel.join("c1").await, Err(Error::NotConnected)));
        assert!(matches!(channel.emit_typing(true).await, Err(Error::NotConnected)));
        // Leaving without a room is a no-op even when disconnected
        assert!(channel.leave().await.is_ok());
    }

    #[tokio::test]
    async fn test_send_before_join_is_rejected() {
        let server = spawn_server().await;
        let channel = WsChannel::new(&server.url, ReconnectConfig::disabled()).unwrap();
        channel.connect("c1").await.unwrap();
        assert!(matches!(channel.send("x").await, Err(Error::NotJoined)));
    }

    #[tokio::test]
    async fn test_connect_refused_leaves_disconnected() {
        // Grab a free port and close it again so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let channel = WsChannel::new(&format!("ws://{}", addr), ReconnectConfig::disabled()).unwrap();
        let err = channel.connect("c1").await.unwrap_err();
        assert_eq!(err.kind(), parley_api::ErrorKind::Transport);
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn test_incoming_events_reach_latest_subscriber() {
        let server = spawn_server().await;
        let channel = WsChannel::new(&server.url, ReconnectConfig::disabled()).unwrap();

        let (old_tx, mut old_rx) = mpsc::unbounded_channel::<Message>();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel::<Message>();
        let (typing_tx, mut typing_rx) = mpsc::unbounded_channel::<bool>();
        channel.on_incoming_message(Arc::new(move |m| {
            let _ = old_tx.send(m);
        }));
        channel.on_incoming_message(Arc::new(move |m| {
            let _ = new_tx.send(m);
        }));
        channel.on_typing(Arc::new(move |e| {
            let _ = typing_tx.send(e.is_typing);
        }));

        channel.connect("c1").await.unwrap();
        let push = server.push.as_ref().unwrap();
        push.send(r#"{"event": "presence", "data": {"online": true}}"#.to_string()).unwrap();
        push.send(
            r#"{"event": "new_message", "data": {"id": "m1", "sender": "agent", "content": "hi", "actions": {"Yes": "y", "No": "n"}}}"#
                .to_string(),
        )
        .unwrap();
        push.send(r#"{"event": "typing", "data": {"userId": "bot", "isTyping": true}}"#.to_string())
            .unwrap();

        let message = tokio::time::timeout(WAIT, new_rx.recv()).await.unwrap().unwrap();
        assert_eq!(message.id, "m1");
        assert_eq!(message.sender, Sender::Agent);
        let labels: Vec<&str> = message.actions.as_ref().unwrap().iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["Yes", "No"]);
        assert!(tokio::time::timeout(WAIT, typing_rx.recv()).await.unwrap().unwrap());
        assert!(old_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_server_close_reports_disconnected() {
        let mut server = spawn_server().await;
        let channel = WsChannel::new(&server.url, ReconnectConfig::disabled()).unwrap();
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        channel.on_status(Arc::new(move |s| {
            let _ = status_tx.send(s);
        }));

        channel.connect("c1").await.unwrap();
        channel.join("c1").await.unwrap();
        next_frame(&mut server.seen).await;
        server.push.take();

        wait_for_state(&channel, ChannelState::Disconnected).await;
        assert!(channel.room().is_none());

        let mut states = vec![];
        while let Ok(s) = status_rx.try_recv() {
            states.push(s);
        }
        assert_eq!(
            states,
            vec![
                ChannelState::Connecting,
                ChannelState::Connected,
                ChannelState::Disconnected
            ]
        );
    }

    #[tokio::test]
    async fn test_disconnect_flushes_leave() {
        let mut server = spawn_server().await;
        let channel = WsChannel::new(&server.url, ReconnectConfig::disabled()).unwrap();
        channel.connect("c1").await.unwrap();
        channel.join("c1").await.unwrap();
        assert_eq!(next_frame(&mut server.seen).await["event"], "join_conversation");

        channel.leave().await.unwrap();
        channel.disconnect().await;
        assert_eq!(channel.state(), ChannelState::Disconnected);

        let frame = next_frame(&mut server.seen).await;
        assert_eq!(frame["event"], "leave_conversation");
        assert_eq!(frame["data"]["conversationId"], "c1");
    }

    #[tokio::test]
    async fn test_auto_reconnect_rejoins_room() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (seen_tx, mut seen) = mpsc::unbounded_channel::<(u32, Value)>();

        tokio::spawn(async move {
            for connection in 1..=2u32 {
                let (tcp, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(tcp).await.unwrap();
                while let Some(Ok(frame)) = ws.next().await {
                    if let Frame::Text(text) = frame {
                        let _ = seen_tx.send((connection, serde_json::from_str(&text).unwrap()));
                        if connection == 1 {
                            // Drop the first connection right after the join
                            break;
                        }
                    }
                }
            }
        });

        let reconnect = ReconnectConfig {
            auto_reconnect: true,
            max_retries: 3,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        };
        let channel = WsChannel::new(&format!("ws://{}", addr), reconnect).unwrap();
        channel.connect("c1").await.unwrap();
        channel.join("c1").await.unwrap();

        let (conn, first) = tokio::time::timeout(WAIT, seen.recv()).await.unwrap().unwrap();
        assert_eq!((conn, first["event"].as_str()), (1, Some("join_conversation")));

        let (conn, rejoin) = tokio::time::timeout(WAIT, seen.recv()).await.unwrap().unwrap();
        assert_eq!(conn, 2);
        assert_eq!(rejoin["event"], "join_conversation");
        assert_eq!(rejoin["data"]["conversationId"], "c1");

        wait_for_state(&channel, ChannelState::Connected).await;
        assert_eq!(channel.room().as_deref(), Some("c1"));
        channel.disconnect().await;
    }
}
