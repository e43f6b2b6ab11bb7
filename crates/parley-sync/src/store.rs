//! Message list reducer
//!
//! The list is kept newest-first. Every change goes through [`Mutation`] and
//! [`MessageStore::apply`]; nothing here does I/O or fails.

use std::collections::HashSet;

use parley_api::Message;

/// The fixed set of list transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Adopt the list verbatim. The caller guarantees ids are unique.
    Replace(Vec<Message>),
    /// Append an older page after dropping messages whose id is already present
    AppendOlder(Vec<Message>),
    /// Prepend a message as the newest
    AppendNewest(Message),
    /// Replace the message with the same id; no-op if absent
    UpdateById(Message),
    /// Remove the message with this id; no-op if absent
    RemoveById(String),
}

/// Ordered, newest-first message list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure transition: consume the current list and return the next one.
    pub fn apply(self, mutation: Mutation) -> Self {
        let mut messages = self.messages;
        match mutation {
            Mutation::Replace(list) => messages = list,
            Mutation::AppendOlder(page) => {
                let mut seen: HashSet<String> = messages.iter().map(|m| m.id.clone()).collect();
                messages.extend(page.into_iter().filter(|m| seen.insert(m.id.clone())));
            }
            Mutation::AppendNewest(message) => messages.insert(0, message),
            Mutation::UpdateById(message) => {
                if let Some(slot) = messages.iter_mut().find(|m| m.id == message.id) {
                    *slot = message;
                }
            }
            Mutation::RemoveById(id) => {
                if let Some(pos) = messages.iter().position(|m| m.id == id) {
                    messages.remove(pos);
                }
            }
        }
        Self { messages }
    }

    /// Apply a mutation in place
    pub fn dispatch(&mut self, mutation: Mutation) {
        let current = std::mem::take(self);
        *self = current.apply(mutation);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn ids(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.id.as_str()).collect()
    }
}

impl From<Vec<Message>> for MessageStore {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// Drop repeated ids, keeping the first occurrence. Used before `Replace`.
pub fn dedup_by_id(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_api::Sender;

    fn msg(id: &str) -> Message {
        Message::new(id, Sender::Agent, format!("message {}", id))
    }

    fn store(ids: &[&str]) -> MessageStore {
        MessageStore::from(ids.iter().map(|id| msg(id)).collect::<Vec<_>>())
    }

    #[test]
    fn test_replace_adopts_list() {
        let s = store(&["9"]).apply(Mutation::Replace(vec![msg("2"), msg("1")]));
        assert_eq!(s.ids(), vec!["2", "1"]);
    }

    #[test]
    fn test_append_older_skips_known_ids() {
        let s = store(&["2", "1"]).apply(Mutation::AppendOlder(vec![msg("1"), msg("0")]));
        assert_eq!(s.ids(), vec!["2", "1", "0"]);
    }

    #[test]
    fn test_append_older_keeps_page_order_and_dedups_within_page() {
        let s = store(&["5"]).apply(Mutation::AppendOlder(vec![
            msg("4"),
            msg("3"),
            msg("4"),
            msg("2"),
        ]));
        assert_eq!(s.ids(), vec!["5", "4", "3", "2"]);
    }

    #[test]
    fn test_append_newest_prepends() {
        let s = store(&["1"]).apply(Mutation::AppendNewest(msg("2")));
        assert_eq!(s.ids(), vec!["2", "1"]);
    }

    #[test]
    fn test_update_by_id() {
        let mut edited = msg("1");
        edited.content = "edited".into();
        let s = store(&["2", "1"]).apply(Mutation::UpdateById(edited));
        assert_eq!(s.ids(), vec!["2", "1"]);
        assert_eq!(s.get("1").unwrap().content, "edited");
        assert_eq!(s.get("2").unwrap().content, "message 2");
    }

    #[test]
    fn test_update_missing_is_noop() {
        let before = store(&["2", "1"]);
        let after = before.clone().apply(Mutation::UpdateById(msg("7")));
        assert_eq!(before, after);
    }

    #[test]
    fn test_remove_by_id() {
        let s = store(&["3", "2", "1"]).apply(Mutation::RemoveById("2".into()));
        assert_eq!(s.ids(), vec!["3", "1"]);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let before = store(&["1"]);
        let after = before.clone().apply(Mutation::RemoveById("nope".into()));
        assert_eq!(before, after);
    }

    #[test]
    fn test_dispatch_in_place() {
        let mut s = MessageStore::new();
        s.dispatch(Mutation::AppendNewest(msg("1")));
        s.dispatch(Mutation::AppendNewest(msg("2")));
        s.dispatch(Mutation::AppendOlder(vec![msg("0")]));
        assert_eq!(s.ids(), vec!["2", "1", "0"]);
        assert!(s.contains("0"));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_no_duplicates_across_mixed_appends() {
        // Deterministic interleaving of overlapping pages and pushes
        let mut s = MessageStore::new();
        for round in 0..20u32 {
            let base = round * 3;
            let page: Vec<Message> = (base..base + 5).map(|i| msg(&i.to_string())).collect();
            s.dispatch(Mutation::AppendOlder(page));
            let pushed = (round * 7 % 40).to_string();
            if !s.contains(&pushed) {
                s.dispatch(Mutation::AppendNewest(msg(&pushed)));
            }
        }
        let ids = s.ids();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_dedup_by_id_keeps_first() {
        let mut first = msg("1");
        first.content = "first".into();
        let out = dedup_by_id(vec![first, msg("2"), msg("1")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].content, "first");
    }
}
