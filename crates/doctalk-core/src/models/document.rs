use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{ConversationId, DocumentId};

/// An uploaded document or video known to the backend.
///
/// Immutable once listed, except for `status`, which the backend advances
/// while it builds the document's embeddings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub uri: Option<String>,
    pub status: DocumentStatus,
    pub size: Option<u64>,
    /// Upload time as reported by the backend, when it could be read.
    pub created: Option<jiff::Timestamp>,
    /// Conversations the backend reports for this document, oldest first.
    pub conversations: Vec<ConversationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DocumentStatus {
    Processing,
    Ready,
    Failed,
}

impl DocumentStatus {
    /// Parse the backend's status label, case-insensitively.
    ///
    /// `UPLOADED` is reported between the storage write and the start of
    /// processing; it is treated as processing.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "uploaded" | "processing" => Some(Self::Processing),
            "ready" => Some(Self::Ready),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
