//! In-process conversation history keyed by sender.

use crate::{ChatMessage, SenderId};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Ordered user/assistant turns for one sender. The system persona is never
/// stored here; it is prepended when the prompt is assembled.
pub type History = Vec<ChatMessage>;

/// Storage backend for per-sender histories.
///
/// Operations are total: an unknown sender simply has an empty history.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// Snapshot of the sender's history, creating an empty one on first access.
    async fn get(&self, sender_id: &str) -> History;

    /// Append a user turn followed by an assistant turn.
    async fn record(&self, sender_id: &str, user_text: &str, model_text: &str);

    /// Take exclusive access to the sender's history for one chat turn.
    ///
    /// Concurrent turns for the same sender queue behind the returned guard,
    /// so a read-then-append can't lose an update.
    async fn begin_turn(&self, sender_id: &str) -> TurnGuard;

    /// Number of senders that currently have a history.
    async fn sender_count(&self) -> usize;
}

/// Exclusive handle on one sender's history.
pub struct TurnGuard {
    sender_id: SenderId,
    history: OwnedMutexGuard<History>,
    max_messages: Option<usize>,
}

impl TurnGuard {
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Append one exchange, then apply the history window if one is set.
    pub fn record(&mut self, user_text: &str, model_text: &str) {
        append_exchange(&mut self.history, user_text, model_text, self.max_messages);
    }
}

/// Default backend: a map living for the lifetime of the process.
///
/// The outer lock only guards map membership. Each history sits behind its own
/// mutex so different senders never contend.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    histories: RwLock<HashMap<SenderId, Arc<Mutex<History>>>>,
    max_messages: Option<usize>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_messages` messages per sender, dropping the oldest
    /// exchanges first. The window always holds at least the latest exchange.
    pub fn with_max_messages(mut self, max_messages: Option<usize>) -> Self {
        self.max_messages = max_messages.map(|max| max.max(2));
        self
    }

    async fn entry(&self, sender_id: &str) -> Arc<Mutex<History>> {
        if let Some(history) = self.histories.read().await.get(sender_id) {
            return history.clone();
        }

        let mut histories = self.histories.write().await;
        histories
            .entry(sender_id.into())
            .or_insert_with(|| {
                tracing::debug!(sender_id, "created conversation history");
                Arc::new(Mutex::new(History::new()))
            })
            .clone()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, sender_id: &str) -> History {
        let entry = self.entry(sender_id).await;
        let history = entry.lock().await;
        history.clone()
    }

    async fn record(&self, sender_id: &str, user_text: &str, model_text: &str) {
        let entry = self.entry(sender_id).await;
        let mut history = entry.lock().await;
        append_exchange(&mut history, user_text, model_text, self.max_messages);
    }

    async fn begin_turn(&self, sender_id: &str) -> TurnGuard {
        let history = self.entry(sender_id).await.lock_owned().await;
        TurnGuard {
            sender_id: sender_id.into(),
            history,
            max_messages: self.max_messages,
        }
    }

    async fn sender_count(&self) -> usize {
        self.histories.read().await.len()
    }
}

fn append_exchange(
    history: &mut History,
    user_text: &str,
    model_text: &str,
    max_messages: Option<usize>,
) {
    history.push(ChatMessage::user(user_text));
    history.push(ChatMessage::assistant(model_text));

    if let Some(max) = max_messages {
        // Drop whole exchanges so the history never starts on an assistant turn.
        while history.len() > max {
            let drop = history.len().min(2);
            history.drain(..drop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[tokio::test]
    async fn unseen_sender_has_empty_history() {
        let store = InMemoryConversationStore::new();

        assert!(store.get("15550001111").await.is_empty());
        assert_eq!(store.sender_count().await, 1);
    }

    #[tokio::test]
    async fn record_appends_user_then_assistant() {
        let store = InMemoryConversationStore::new();
        store.record("15550001111", "hello", "hi there").await;

        let history = store.get("15550001111").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatMessage::user("hello"));
        assert_eq!(history[1], ChatMessage::assistant("hi there"));
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn senders_do_not_share_history() {
        let store = InMemoryConversationStore::new();
        store.record("alice", "one", "uno").await;

        assert!(store.get("bob").await.is_empty());
        assert_eq!(store.get("alice").await.len(), 2);
    }

    #[tokio::test]
    async fn window_drops_oldest_exchanges() {
        let store = InMemoryConversationStore::new().with_max_messages(Some(4));
        for index in 0..3 {
            store
                .record("alice", &format!("q{index}"), &format!("a{index}"))
                .await;
        }

        let history = store.get("alice").await;
        assert_eq!(
            history,
            vec![
                ChatMessage::user("q1"),
                ChatMessage::assistant("a1"),
                ChatMessage::user("q2"),
                ChatMessage::assistant("a2"),
            ]
        );
    }

    #[tokio::test]
    async fn odd_window_keeps_history_aligned_on_user_turns() {
        let store = InMemoryConversationStore::new().with_max_messages(Some(3));
        store.record("alice", "q0", "a0").await;
        store.record("alice", "q1", "a1").await;

        let history = store.get("alice").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "q1");
    }

    #[tokio::test]
    async fn tiny_window_still_keeps_latest_exchange() {
        let store = InMemoryConversationStore::new().with_max_messages(Some(1));
        store.record("alice", "q0", "a0").await;
        store.record("alice", "q1", "a1").await;

        assert_eq!(
            store.get("alice").await,
            vec![ChatMessage::user("q1"), ChatMessage::assistant("a1")]
        );
    }

    #[tokio::test]
    async fn turn_guard_serializes_same_sender() {
        let store = Arc::new(InMemoryConversationStore::new());
        let mut first = store.begin_turn("alice").await;

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut guard = store.begin_turn("alice").await;
                let seen = guard.history().len();
                guard.record("second", "reply two");
                seen
            })
        };

        // Other senders are not blocked while alice's turn is open.
        assert!(store.get("bob").await.is_empty());

        first.record("first", "reply one");
        drop(first);

        let seen_by_second = contender.await.expect("contender task panicked");
        assert_eq!(seen_by_second, 2);
        assert_eq!(store.get("alice").await.len(), 4);
    }
}
