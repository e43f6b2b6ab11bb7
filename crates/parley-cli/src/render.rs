//! Plain-text rendering of messages and sync events

use parley_api::{Message, Sender};
use parley_sync::{ChannelState, SyncEvent};

pub fn format_message(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Agent => "agent",
    };
    let mut out = format!("[{}] {}: {}", message.id, who, message.content);
    if let Some(actions) = &message.actions {
        for (label, action) in actions.iter() {
            out.push_str(&format!("\n    > {} ({})", label, action));
        }
    }
    out
}

/// Render messages oldest-first from a newest-first slice
pub fn format_history<'a>(messages: impl DoubleEndedIterator<Item = &'a Message>) -> String {
    messages
        .rev()
        .map(format_message)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Line to print for an event, if it is worth showing
pub fn format_event(event: &SyncEvent) -> Option<String> {
    match event {
        SyncEvent::MessageReceived { message } => Some(format_message(message)),
        SyncEvent::PeerTyping { is_typing: true } => Some("(agent is typing...)".to_string()),
        SyncEvent::ChannelStatus {
            state: ChannelState::Disconnected,
        } => Some("(disconnected)".to_string()),
        SyncEvent::Error { message } => Some(format!("error: {}", message)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_api::Actions;

    #[test]
    fn test_message_with_actions() {
        let actions: Actions = [("Yes", "confirm"), ("No", "cancel")].into_iter().collect();
        let message = Message::new("3", Sender::Agent, "Book it?").with_actions(actions);
        assert_eq!(
            format_message(&message),
            "[3] agent: Book it?\n    > Yes (confirm)\n    > No (cancel)"
        );
    }

    #[test]
    fn test_history_is_oldest_first() {
        let messages = vec![
            Message::new("2", Sender::Agent, "hi"),
            Message::new("1", Sender::User, "hello"),
        ];
        assert_eq!(
            format_history(messages.iter()),
            "[1] you: hello\n[2] agent: hi"
        );
    }

    #[test]
    fn test_quiet_events() {
        assert!(
            format_event(&SyncEvent::MessagesChanged {
                len: 1,
                total: 1,
                has_more: false
            })
            .is_none()
        );
        assert!(format_event(&SyncEvent::PeerTyping { is_typing: false }).is_none());
        assert_eq!(
            format_event(&SyncEvent::Error {
                message: "Failed to send message.".into()
            })
            .as_deref(),
            Some("error: Failed to send message.")
        );
    }
}
