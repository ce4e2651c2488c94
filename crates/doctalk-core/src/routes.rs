//! Backend path conventions.
//!
//! Pure string functions defining the request paths of the inference
//! backend, relative to its base URL.

use crate::ids::{ConversationId, DocumentId};

pub const PRESIGNED_URL: &str = "/generate_presigned_url";

pub const DOCUMENTS: &str = "/doc";

pub const DELETE_HISTORY: &str = "/Delete_History";

pub const DELETE_FULL: &str = "/Delete_Full";

/// `POST` here creates a new conversation for the document.
pub fn document(document_id: &DocumentId) -> String {
    format!("/doc/{document_id}")
}

pub fn conversation(document_id: &DocumentId, conversation_id: &ConversationId) -> String {
    format!("/doc/{document_id}/{conversation_id}")
}

/// `POST` here triggers an assistant turn.
pub fn submit(document_id: &DocumentId, conversation_id: &ConversationId) -> String {
    format!("/{document_id}/{conversation_id}")
}
