//! Per-group chat
//!
//! Append-only message log, fully independent of game state: no invariant
//! here is shared with the coordination core. Ordering comes from the
//! store's creation sequence, so no client clocks are involved.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::lobby::group::GroupId;
use crate::store::{DocPath, MemoryStore, QueryWatch, StoreError};

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the sender; identity is not validated here
    pub author: String,
    pub text: String,
}

fn messages_collection(group_id: GroupId) -> String {
    format!("groups/{}/messages", group_id)
}

/// Append a message to the group log. Blank messages are dropped.
pub async fn post(
    store: &MemoryStore,
    group_id: GroupId,
    author: &str,
    text: &str,
) -> Result<(), StoreError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }
    let message = ChatMessage {
        author: author.to_string(),
        text: text.to_string(),
    };
    let path = DocPath::new(messages_collection(group_id), Uuid::new_v4().to_string());
    store.set(&path, &message).await
}

/// Ordered subscription to a group's chat log.
pub struct MessageWatch {
    inner: QueryWatch,
}

impl MessageWatch {
    /// Next full log snapshot, oldest message first.
    pub async fn next(&mut self) -> Option<Vec<ChatMessage>> {
        let docs = self.inner.next().await?;
        let mut messages = Vec::with_capacity(docs.len());
        for doc in docs {
            match doc.decode::<ChatMessage>() {
                Ok(message) => messages.push(message),
                Err(e) => warn!("corrupt chat message {}: {}", doc.id, e),
            }
        }
        Some(messages)
    }
}

/// Subscribe to a group's chat log.
pub fn watch(store: &MemoryStore, group_id: GroupId) -> MessageWatch {
    MessageWatch {
        inner: store.watch_query(&messages_collection(group_id), |_| true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_arrive_in_post_order() {
        let store = MemoryStore::new();
        let group_id = Uuid::new_v4();

        post(&store, group_id, "ada", "anyone see the exit?").await.unwrap();
        post(&store, group_id, "grace", "bottom right, as always").await.unwrap();
        post(&store, group_id, "alan", "go down").await.unwrap();

        let mut watch = watch(&store, group_id);
        let log = watch.next().await.unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].author, "ada");
        assert_eq!(log[1].author, "grace");
        assert_eq!(log[2].author, "alan");
    }

    #[tokio::test]
    async fn test_watch_sees_new_posts() {
        let store = MemoryStore::new();
        let group_id = Uuid::new_v4();

        let mut watch = watch(&store, group_id);
        assert_eq!(watch.next().await.map(|log| log.len()), Some(0));

        post(&store, group_id, "ada", "hello").await.unwrap();
        let log = watch.next().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].text, "hello");
    }

    #[tokio::test]
    async fn test_blank_messages_dropped() {
        let store = MemoryStore::new();
        let group_id = Uuid::new_v4();

        post(&store, group_id, "ada", "   ").await.unwrap();
        post(&store, group_id, "ada", "").await.unwrap();

        let mut watch = watch(&store, group_id);
        assert_eq!(watch.next().await.map(|log| log.len()), Some(0));
    }

    #[tokio::test]
    async fn test_logs_are_per_group() {
        let store = MemoryStore::new();
        let group_a = Uuid::new_v4();
        let group_b = Uuid::new_v4();

        post(&store, group_a, "ada", "only for a").await.unwrap();

        let mut watch_b = watch(&store, group_b);
        assert_eq!(watch_b.next().await.map(|log| log.len()), Some(0));
    }
}
