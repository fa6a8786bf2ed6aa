//! Data models for Huddle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Calls
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    #[default]
    Idle,
    Ringing,
    Connected,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Audio,
    Video,
}

impl CallType {
    pub fn label(&self) -> &'static str {
        match self {
            CallType::Audio => "Audio",
            CallType::Video => "Video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallParticipant {
    pub name: String,
    pub avatar: Option<String>,
}

impl CallParticipant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: None,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// Snapshot of the call overlay state.
///
/// `participant` and `call_type` are set whenever `status` is not idle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallSession {
    pub status: CallStatus,
    pub call_type: Option<CallType>,
    pub participant: Option<CallParticipant>,
    pub is_muted: bool,
    pub is_video_off: bool,
    pub elapsed_seconds: u64,
}

impl CallSession {
    pub fn is_active(&self) -> bool {
        self.status != CallStatus::Idle
    }
}

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::File => "file",
        }
    }
}

/// A message as seen by a room listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub room_id: String,
    pub text: String,
    pub sender_id: String,
    pub sender_name: String,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInput {
    pub text: String,
    pub sender_id: String,
    pub sender_name: String,
    pub room_id: String,
}

// ============================================================================
// Users
// ============================================================================

/// Record stored under `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

/// Chat list entry: a contact, the shared room and its latest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub room_id: String,
    pub contact: Contact,
    pub last_message: Option<ChatMessage>,
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardMessage {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallLogStatus {
    Completed,
    Missed,
    Declined,
    Ongoing,
}

impl CallLogStatus {
    pub const ALL: [CallLogStatus; 4] = [
        CallLogStatus::Completed,
        CallLogStatus::Missed,
        CallLogStatus::Declined,
        CallLogStatus::Ongoing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallLogStatus::Completed => "completed",
            CallLogStatus::Missed => "missed",
            CallLogStatus::Declined => "declined",
            CallLogStatus::Ongoing => "ongoing",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CallLogStatus::Completed => "Completed",
            CallLogStatus::Missed => "Missed",
            CallLogStatus::Declined => "Declined",
            CallLogStatus::Ongoing => "Ongoing",
        }
    }
}

impl fmt::Display for CallLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLogRecord {
    pub id: String,
    pub room_id: String,
    pub caller_id: String,
    pub caller_name: String,
    pub receiver_id: String,
    pub receiver_name: String,
    pub status: CallLogStatus,
    /// Seconds; zero unless the call completed.
    pub duration: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub call_type: CallType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Away,
}

impl UserStatus {
    pub const ALL: [UserStatus; 3] = [UserStatus::Active, UserStatus::Inactive, UserStatus::Away];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Away => "away",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
            UserStatus::Away => "Away",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatRecord {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub status: UserStatus,
    pub last_seen: DateTime<Utc>,
    pub total_messages: u64,
    pub total_calls: u64,
    /// Seconds.
    pub total_call_duration: u64,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_messages: usize,
    pub total_calls: usize,
    pub active_users: usize,
    pub total_call_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DashboardData {
    pub messages: Vec<DashboardMessage>,
    pub call_logs: Vec<CallLogRecord>,
    pub user_stats: Vec<UserStatRecord>,
    pub stats: DashboardStats,
}

impl DashboardData {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.call_logs.is_empty() && self.user_stats.is_empty()
    }
}
