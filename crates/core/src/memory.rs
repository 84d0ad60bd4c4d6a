//! Bounded, append-only conversation history.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConversationMessage {
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemorySummary {
    pub session_start: DateTime<Utc>,
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub duration_minutes: i64,
}

impl fmt::Display for MemorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Conversation Summary:\n\
             - Session Start: {start}\n\
             - Total Messages: {total}\n\
             - User Messages: {user}\n\
             - Assistant Messages: {assistant}\n\
             - Duration: {minutes} minutes",
            start = self.session_start.format("%Y-%m-%d %H:%M:%S"),
            total = self.total_messages,
            user = self.user_messages,
            assistant = self.assistant_messages,
            minutes = self.duration_minutes,
        )
    }
}

/// Sliding-window message log: once `max_messages` is exceeded, the oldest
/// entries are evicted from the front.
pub struct ConversationMemory {
    max_messages: usize,
    messages: VecDeque<ConversationMessage>,
    session_start: DateTime<Utc>,
}

impl ConversationMemory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(1),
            messages: VecDeque::new(),
            session_start: Utc::now(),
        }
    }

    pub fn add_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) {
        self.messages.push_back(ConversationMessage {
            timestamp: Utc::now(),
            role,
            content: content.into(),
            metadata,
        });
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    /// Last `n` messages in chronological order.
    pub fn recent(&self, n: usize) -> Vec<&ConversationMessage> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).collect()
    }

    /// Case-insensitive substring search over message content, original
    /// order preserved.
    pub fn search(&self, text: &str) -> Vec<&ConversationMessage> {
        let needle = text.to_lowercase();
        self.messages
            .iter()
            .filter(|message| message.content.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn summary(&self) -> MemorySummary {
        let user_messages =
            self.messages.iter().filter(|message| message.role == Role::User).count();
        MemorySummary {
            session_start: self.session_start,
            total_messages: self.messages.len(),
            user_messages,
            assistant_messages: self.messages.len() - user_messages,
            duration_minutes: (Utc::now() - self.session_start).num_minutes(),
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.session_start = Utc::now();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{ConversationMemory, Role};

    fn no_metadata() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    #[test]
    fn eviction_keeps_the_newest_messages_oldest_first() {
        let mut memory = ConversationMemory::new(3);
        for index in 0..5 {
            memory.add_message(Role::User, format!("message {index}"), no_metadata());
        }

        let recent = memory.recent(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "message 2");
        assert_eq!(recent[2].content, "message 4");
    }

    #[test]
    fn recent_returns_the_tail_in_chronological_order() {
        let mut memory = ConversationMemory::new(10);
        memory.add_message(Role::User, "first", no_metadata());
        memory.add_message(Role::Assistant, "second", no_metadata());
        memory.add_message(Role::User, "third", no_metadata());

        let recent = memory.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "second");
        assert_eq!(recent[1].content, "third");
    }

    #[test]
    fn search_is_case_insensitive_and_order_preserving() {
        let mut memory = ConversationMemory::new(10);
        memory.add_message(Role::User, "Show me DELAYED shipments", no_metadata());
        memory.add_message(Role::Assistant, "2 delayed BOLs found", no_metadata());
        memory.add_message(Role::User, "thanks", no_metadata());

        let hits = memory.search("delayed");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].role, Role::User);
        assert_eq!(hits[1].role, Role::Assistant);
    }

    #[test]
    fn summary_counts_roles() {
        let mut memory = ConversationMemory::new(10);
        memory.add_message(Role::User, "hello", no_metadata());
        memory.add_message(Role::Assistant, "hi", no_metadata());
        memory.add_message(Role::User, "show alerts", no_metadata());

        let summary = memory.summary();
        assert_eq!(summary.total_messages, 3);
        assert_eq!(summary.user_messages, 2);
        assert_eq!(summary.assistant_messages, 1);
        assert!(summary.duration_minutes >= 0);
    }

    #[test]
    fn clear_empties_the_log_and_restarts_the_session() {
        let mut memory = ConversationMemory::new(10);
        memory.add_message(Role::User, "hello", no_metadata());
        let started = memory.summary().session_start;

        memory.clear();
        assert!(memory.is_empty());
        assert!(memory.summary().session_start >= started);
    }
}
