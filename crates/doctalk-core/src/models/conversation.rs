use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::document::Document;
use super::message::Message;
use crate::ids::{ConversationId, DocumentId};

/// A conversation as fetched from the backend. `messages` is the
/// authoritative log.
///
/// There is no model or language here: the backend does not store them per
/// conversation. They are the session's current selection and travel with
/// each prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Conversation {
    pub id: ConversationId,
    pub document: Document,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn document_id(&self) -> &DocumentId {
        &self.document.id
    }

    /// The uploaded file name, sent along with every prompt.
    pub fn file_name(&self) -> &str {
        &self.document.name
    }
}
