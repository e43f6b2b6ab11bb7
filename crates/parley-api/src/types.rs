//! Core types shared by the HTTP client and the push channel

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "support", alias = "ai", alias = "assistant")]
    Agent,
}

impl Sender {
    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "you",
            Sender::Agent => "agent",
        }
    }
}

/// Quick-reply actions attached to a message: label -> action identifier.
///
/// Serialized as a JSON object. Entry order is kept as received because the
/// widget renders the buttons in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actions(Vec<(String, String)>);

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an action. An existing label keeps its position and gets the new identifier.
    pub fn insert(&mut self, label: impl Into<String>, action: impl Into<String>) {
        let label = label.into();
        let action = action.into();
        match self.0.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = action,
            None => self.0.push((label, action)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, a)| a.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, a)| (l.as_str(), a.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<L: Into<String>, A: Into<String>> FromIterator<(L, A)> for Actions {
    fn from_iter<T: IntoIterator<Item = (L, A)>>(iter: T) -> Self {
        let mut actions = Actions::new();
        for (label, action) in iter {
            actions.insert(label, action);
        }
        actions
    }
}

impl Serialize for Actions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, action) in &self.0 {
            map.serialize_entry(label, action)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Actions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ActionsVisitor;

        impl<'de> Visitor<'de> for ActionsVisitor {
            type Value = Actions;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of action labels to action identifiers")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> std::result::Result<Actions, M::Error> {
                let mut actions = Actions::new();
                while let Some((label, action)) = access.next_entry::<String, String>()? {
                    actions.insert(label, action);
                }
                Ok(actions)
            }
        }

        deserializer.deserialize_map(ActionsVisitor)
    }
}

/// A chat message. `id` is always assigned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    #[serde(alias = "text")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Actions>,
    #[serde(default, alias = "timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a message without actions or timestamp
    pub fn new(id: impl Into<String>, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender,
            content: content.into(),
            actions: None,
            created_at: None,
        }
    }

    /// Attach quick-reply actions
    pub fn with_actions(mut self, actions: Actions) -> Self {
        self.actions = Some(actions);
        self
    }
}

/// Server-side conversation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// One page of history as returned by the messages endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: usize,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
}

/// Peer typing notification from the push channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    #[serde(default)]
    pub user_id: Option<String>,
    pub is_typing: bool,
}

/// Pagination position: 1-based page number and a fixed page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    page: u32,
    size: u32,
}

impl Cursor {
    /// Build a cursor, rejecting `page == 0` or `size == 0`
    pub fn new(page: u32, size: u32) -> Result<Self> {
        if page == 0 {
            return Err(Error::Validation("page must be >= 1".into()));
        }
        if size == 0 {
            return Err(Error::Validation("page size must be >= 1".into()));
        }
        Ok(Self { page, size })
    }

    /// First page with the given size
    pub fn first(size: u32) -> Result<Self> {
        Self::new(1, size)
    }

    /// The cursor for the next older page
    pub fn next(self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            size: self.size,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}
