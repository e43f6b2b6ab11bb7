//! Push-channel wire protocol
//!
//! Every WebSocket text frame carries one JSON event of the form
//! `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Message, TypingEvent};

/// Events sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    JoinConversation { conversation_id: String },
    LeaveConversation { conversation_id: String },
    SendMessage { conversation_id: String, content: String },
    Typing { conversation_id: String, is_typing: bool },
}

impl ClientEvent {
    /// Encode as a text frame payload
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinConversation { .. } => "join_conversation",
            ClientEvent::LeaveConversation { .. } => "leave_conversation",
            ClientEvent::SendMessage { .. } => "send_message",
            ClientEvent::Typing { .. } => "typing",
        }
    }
}

/// Events pushed by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage(Message),
    Typing(TypingEvent),
}

impl ServerEvent {
    /// Decode a text frame payload
    pub fn parse(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sender;

    #[test]
    fn test_client_event_wire_shape() {
        let frame = ClientEvent::SendMessage {
            conversation_id: "c1".into(),
            content: "hello".into(),
        }
        .to_frame()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "event": "send_message",
                "data": {"conversationId": "c1", "content": "hello"}
            })
        );
    }

    #[test]
    fn test_typing_wire_shape() {
        let frame = ClientEvent::Typing {
            conversation_id: "c1".into(),
            is_typing: true,
        }
        .to_frame()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "typing");
        assert_eq!(value["data"]["isTyping"], true);
    }

    #[test]
    fn test_name_matches_serialized_tag() {
        let events = [
            ClientEvent::JoinConversation { conversation_id: "c".into() },
            ClientEvent::LeaveConversation { conversation_id: "c".into() },
            ClientEvent::SendMessage { conversation_id: "c".into(), content: "x".into() },
            ClientEvent::Typing { conversation_id: "c".into(), is_typing: false },
        ];
        for event in events {
            let value: serde_json::Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }

    #[test]
    fn test_parse_new_message() {
        let event = ServerEvent::parse(
            r#"{"event": "new_message", "data": {"id": "42", "sender": "agent", "content": "hi"}}"#,
        )
        .unwrap();
        match event {
            ServerEvent::NewMessage(m) => {
                assert_eq!(m.id, "42");
                assert_eq!(m.sender, Sender::Agent);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_typing() {
        let event =
            ServerEvent::parse(r#"{"event": "typing", "data": {"userId": "bot", "isTyping": false}}"#)
                .unwrap();
        assert_eq!(
            event,
            ServerEvent::Typing(TypingEvent {
                user_id: Some("bot".into()),
                is_typing: false
            })
        );
    }

    #[test]
    fn test_parse_unknown_event_fails() {
        assert!(ServerEvent::parse(r#"{"event": "presence", "data": {}}"#).is_err());
    }
}
