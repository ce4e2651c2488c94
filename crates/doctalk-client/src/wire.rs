//! JSON shapes of the backend, and their conversion into core types.
//!
//! Field names follow the deployed backend (`documentid`, `fileName`,
//! `model_id`, ...), which is not consistent in its casing.

use serde::{Deserialize, Serialize};
use tracing::warn;

use doctalk_core::ids::{ConversationId, DocumentId};
use doctalk_core::models::conversation::Conversation;
use doctalk_core::models::document::{Document, DocumentStatus};
use doctalk_core::models::message::{Message, Role};

// ── Responses ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PresignedUrlResponse {
    #[serde(alias = "presignedUrl")]
    pub presignedurl: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationResponse {
    #[serde(alias = "conversationId")]
    pub conversationid: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentWire {
    pub documentid: String,
    pub filename: String,
    #[serde(default)]
    pub docstatus: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    /// Reported either as a number or as a numeric string.
    #[serde(default)]
    pub filesize: Option<serde_json::Value>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub conversations: Vec<ConversationSummaryWire>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationSummaryWire {
    pub conversationid: String,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationWire {
    pub conversationid: String,
    pub document: DocumentWire,
    #[serde(default)]
    pub messages: Vec<MessageWire>,
}

#[derive(Debug, Deserialize)]
pub struct MessageWire {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: MessageDataWire,
}

#[derive(Debug, Deserialize)]
pub struct MessageDataWire {
    pub content: String,
}

/// Error payload of a non-success response, when the backend sends one.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SubmitBody<'a> {
    #[serde(rename = "fileName")]
    pub file_name: &'a str,
    pub prompt: &'a str,
    pub language: &'a str,
    pub model_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DeleteHistoryBody<'a> {
    pub conversation_ids: &'a [ConversationId],
}

#[derive(Debug, Serialize)]
pub struct DeleteFullBody<'a> {
    pub conversation_ids: &'a [ConversationId],
    pub document_id: &'a DocumentId,
}

// ── Conversion ───────────────────────────────────────────────────────────────

impl From<DocumentWire> for Document {
    fn from(wire: DocumentWire) -> Self {
        let status = match wire.docstatus.as_deref() {
            None => DocumentStatus::Processing,
            Some(label) => DocumentStatus::from_label(label).unwrap_or_else(|| {
                warn!(document_id = %wire.documentid, label, "unknown document status");
                DocumentStatus::Processing
            }),
        };

        let size = wire.filesize.as_ref().and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        });

        let created = wire.created.as_deref().and_then(|raw| {
            let created = parse_timestamp(raw);
            if created.is_none() {
                warn!(document_id = %wire.documentid, raw, "unreadable document timestamp");
            }
            created
        });

        Document {
            id: DocumentId::new(wire.documentid),
            name: wire.filename,
            uri: wire.uri,
            status,
            size,
            created,
            conversations: wire
                .conversations
                .into_iter()
                .map(|c| ConversationId::new(c.conversationid))
                .collect(),
        }
    }
}

/// Read a backend timestamp. RFC 3339 with an offset is the norm; a value
/// without an offset is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<jiff::Timestamp> {
    let raw = raw.trim();
    if let Ok(ts) = raw.parse::<jiff::Timestamp>() {
        return Some(ts);
    }
    raw.parse::<jiff::civil::DateTime>()
        .ok()
        .and_then(|dt| dt.to_zoned(jiff::tz::TimeZone::UTC).ok())
        .map(|zoned| zoned.timestamp())
}

impl MessageWire {
    /// `ai` turns are the assistant's; `human` and the client-side `text`
    /// preview are the user's.
    pub fn role(&self) -> Role {
        match self.kind.as_str() {
            "ai" | "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

impl From<ConversationWire> for Conversation {
    fn from(wire: ConversationWire) -> Self {
        let messages = wire
            .messages
            .into_iter()
            .enumerate()
            .map(|(index, m)| Message::confirmed(m.role(), m.data.content, index))
            .collect();

        Conversation {
            id: ConversationId::new(wire.conversationid),
            document: wire.document.into(),
            messages,
        }
    }
}
