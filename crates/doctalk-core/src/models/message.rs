use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A single message in a conversation log.
///
/// `index` is the position in chronological send/receive order. Logs are
/// never reordered or deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Message {
    pub kind: MessageKind,
    pub role: Role,
    pub content: String,
    pub index: usize,
    pub phase: MessagePhase,
}

impl Message {
    /// A user message appended locally before the backend has confirmed it.
    pub fn optimistic(content: impl Into<String>, index: usize) -> Self {
        Self {
            kind: MessageKind::Text,
            role: Role::User,
            content: content.into(),
            index,
            phase: MessagePhase::Optimistic,
        }
    }

    /// A message as returned by the backend.
    pub fn confirmed(role: Role, content: impl Into<String>, index: usize) -> Self {
        Self {
            kind: MessageKind::Text,
            role,
            content: content.into(),
            index,
            phase: MessagePhase::Confirmed,
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.phase == MessagePhase::Optimistic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MessageKind {
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle of a message in the local log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MessagePhase {
    /// Shown locally, not yet part of the backend's log.
    Optimistic,
    /// Part of the authoritative log.
    Confirmed,
}
