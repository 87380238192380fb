//! UI-agnostic conversation state types
//!
//! This module contains the wire-level chat message used for completion
//! requests and the transcript shown by the assistant dialog. Neither
//! depends on any specific UI framework.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A chat message sent to the completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Who a transcript line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    System,
}

/// Stable handle to a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub sender: Sender,
    pub text: String,
    /// Placeholder still waiting for its reply
    pub pending: bool,
}

/// Ordered dialog transcript.
///
/// Entries are only ever appended, except that a pending placeholder can
/// be resolved in place once its reply arrives. Each request owns its own
/// placeholder id, so replies may land in any order.
#[derive(Debug, Default)]
pub struct Transcript {
    order: Vec<EntryId>,
    entries: HashMap<EntryId, Entry>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sender: Sender, text: impl Into<String>) -> EntryId {
        self.insert(Entry {
            sender,
            text: text.into(),
            pending: false,
        })
    }

    /// Append an assistant placeholder to be resolved later
    pub fn push_placeholder(&mut self, text: impl Into<String>) -> EntryId {
        self.insert(Entry {
            sender: Sender::Assistant,
            text: text.into(),
            pending: true,
        })
    }

    /// Replace a pending placeholder with its final text.
    ///
    /// Returns false if the id is unknown or was already resolved.
    pub fn resolve(&mut self, id: EntryId, text: impl Into<String>) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if entry.pending => {
                entry.text = text.into();
                entry.pending = false;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    /// Entries in display order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.values().filter(|e| e.pending).count()
    }

    fn insert(&mut self, entry: Entry) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.order.push(id);
        self.entries.insert(id, entry);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::system("hi")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"hi"}"#);
    }

    #[test]
    fn test_resolve_replaces_in_place() {
        let mut t = Transcript::new();
        t.push(Sender::System, "ready");
        t.push(Sender::User, "what is this?");
        let id = t.push_placeholder("Thinking...");
        t.push(Sender::User, "later message");

        assert!(t.resolve(id, "A quarterly report."));

        let texts: Vec<&str> = t.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["ready", "what is this?", "A quarterly report.", "later message"]
        );
        assert_eq!(t.pending_count(), 0);
    }

    #[test]
    fn test_resolve_twice_is_rejected() {
        let mut t = Transcript::new();
        let id = t.push_placeholder("Thinking...");
        assert!(t.resolve(id, "first"));
        assert!(!t.resolve(id, "second"));
        assert_eq!(t.get(id).unwrap().text, "first");
    }

    #[test]
    fn test_resolve_non_placeholder_is_rejected() {
        let mut t = Transcript::new();
        let id = t.push(Sender::User, "hello");
        assert!(!t.resolve(id, "overwritten"));
        assert_eq!(t.get(id).unwrap().text, "hello");
    }

    #[test]
    fn test_out_of_order_replies_keep_positions() {
        let mut t = Transcript::new();
        t.push(Sender::User, "q1");
        let first = t.push_placeholder("Thinking...");
        t.push(Sender::User, "q2");
        let second = t.push_placeholder("Thinking...");
        assert_eq!(t.pending_count(), 2);

        // Second reply arrives first
        assert!(t.resolve(second, "a2"));
        assert_eq!(t.get(first).unwrap().text, "Thinking...");
        assert!(t.get(first).unwrap().pending);
        assert!(t.resolve(first, "a1"));

        let texts: Vec<&str> = t.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["q1", "a1", "q2", "a2"]);
        assert_eq!(t.len(), 4);
    }
}
