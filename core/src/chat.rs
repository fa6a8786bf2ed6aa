//! Chat rooms over the realtime store

use crate::error::{Error, Result};
use crate::models::{ChatMessage, Contact, Conversation, MessageInput};
use crate::store::{server_timestamp, Listener, Query, RealtimeStore, Snapshot, Subscription};
use serde_json::{json, Value};
use std::sync::Arc;

/// Number of most recent messages a room listener receives.
pub const MESSAGE_WINDOW: usize = 50;

/// Room shared by two participants. Symmetric in its arguments.
pub fn room_id(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}_{}", a, b)
    } else {
        format!("{}_{}", b, a)
    }
}

fn messages_path(room_id: &str) -> String {
    format!("messages/{}", room_id)
}

/// Turn a room snapshot into display order.
///
/// A missing or non-numeric timestamp is a server timestamp that has not been
/// resolved yet and falls back to `now_ms`; entries that still end up at or
/// below zero are dropped.
pub fn parse_messages(room_id: &str, snapshot: &Snapshot, now_ms: i64) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = snapshot
        .children()
        .into_iter()
        .map(|(key, value)| parse_message(room_id, key, value, now_ms))
        .filter(|m| m.timestamp > 0)
        .collect();
    messages.sort_by_key(|m| m.timestamp);
    messages
}

fn parse_message(room_id: &str, key: &str, value: &Value, now_ms: i64) -> ChatMessage {
    let field = |name: &str| value[name].as_str().unwrap_or_default().to_string();

    let timestamp = match value["timestamp"].as_f64() {
        Some(ts) if ts != 0.0 => ts as i64,
        _ => now_ms,
    };

    ChatMessage {
        id: key.to_string(),
        room_id: room_id.to_string(),
        text: field("text"),
        sender_id: field("senderId"),
        sender_name: field("senderName"),
        timestamp,
    }
}

/// Sort a chat list by most recent activity.
pub fn sort_conversations(conversations: &mut [Conversation]) {
    conversations.sort_by_key(|c| {
        std::cmp::Reverse(c.last_message.as_ref().map(|m| m.timestamp).unwrap_or(0))
    });
}

/// One conversation per contact, keyed by the room shared with `current_user_id`.
pub fn conversations_for(current_user_id: &str, contacts: &[Contact]) -> Vec<Conversation> {
    contacts
        .iter()
        .filter(|c| c.id != current_user_id)
        .map(|c| Conversation {
            room_id: room_id(current_user_id, &c.id),
            contact: c.clone(),
            last_message: None,
        })
        .collect()
}

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn RealtimeStore>,
    window: usize,
}

impl ChatService {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self::with_window(store, MESSAGE_WINDOW)
    }

    pub fn with_window(store: Arc<dyn RealtimeStore>, window: usize) -> Self {
        Self {
            store,
            window: window.max(1),
        }
    }

    /// Append a message to its room. Returns the store key.
    pub async fn send_message(&self, input: MessageInput) -> Result<String> {
        let text = input.text.trim();
        if text.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let record = json!({
            "text": text,
            "senderId": input.sender_id,
            "senderName": input.sender_name,
            "timestamp": server_timestamp(),
        });

        match self.store.push(&messages_path(&input.room_id), record).await {
            Ok(key) => {
                tracing::debug!(room_id = %input.room_id, key = %key, "Message sent");
                Ok(key)
            }
            Err(e) => {
                tracing::error!(room_id = %input.room_id, error = %e, "Error sending message");
                Err(e)
            }
        }
    }

    /// Follow the newest messages of a room in ascending time order.
    /// Store errors are logged and reported as an empty room.
    pub fn listen_messages<F>(&self, room_id: &str, callback: F) -> Subscription
    where
        F: Fn(Vec<ChatMessage>) + Send + Sync + 'static,
    {
        let room = room_id.to_string();
        let listener: Listener = Arc::new(move |snapshot: Result<Snapshot>| match snapshot {
            Ok(snapshot) => {
                let now = chrono::Utc::now().timestamp_millis();
                callback(parse_messages(&room, &snapshot, now));
            }
            Err(e) => {
                tracing::error!(room_id = %room, error = %e, "Error listening to messages");
                callback(Vec::new());
            }
        });

        self.store.subscribe(
            Query::new(messages_path(room_id)).limit_to_last(self.window),
            listener,
        )
    }

    /// Follow only the latest message of a room, for chat list previews.
    pub fn last_message<F>(&self, room_id: &str, callback: F) -> Subscription
    where
        F: Fn(Option<ChatMessage>) + Send + Sync + 'static,
    {
        let room = room_id.to_string();
        let listener: Listener = Arc::new(move |snapshot: Result<Snapshot>| match snapshot {
            Ok(snapshot) => {
                let now = chrono::Utc::now().timestamp_millis();
                let last = snapshot
                    .children()
                    .last()
                    .map(|(key, value)| parse_message(&room, key, value, now));
                callback(last);
            }
            Err(e) => {
                tracing::error!(room_id = %room, error = %e, "Error getting last message");
                callback(None);
            }
        });

        self.store
            .subscribe(Query::new(messages_path(room_id)).limit_to_last(1), listener)
    }
}
