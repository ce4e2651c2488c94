use std::future::Future;
use std::pin::Pin;

use doctalk_core::ids::{ConversationId, DocumentId};
use doctalk_core::models::conversation::Conversation;
use doctalk_core::models::document::Document;

use crate::error::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything the backend needs to run one assistant turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub document_id: DocumentId,
    pub conversation_id: ConversationId,
    pub file_name: String,
    pub prompt: String,
    pub model_id: String,
    pub language: String,
}

/// The backend request contract consumed by the orchestration core.
///
/// Every method is exactly one network round-trip. Implementations never
/// retry; that decision belongs to the caller.
///
/// Methods return boxed futures for dyn compatibility.
pub trait Backend: Send + Sync {
    /// Obtain a short-lived write URL for `file_name`.
    fn presigned_url(&self, file_name: &str) -> BoxFuture<'_, Result<String>>;

    /// Transfer raw bytes to a presigned URL with the given `Content-Type`.
    fn put_object(
        &self,
        url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'_, Result<()>>;

    /// The backend's full, current document list.
    fn list_documents(&self) -> BoxFuture<'_, Result<Vec<Document>>>;

    /// Fetch a conversation with its authoritative message log.
    fn get_conversation(
        &self,
        document_id: &DocumentId,
        conversation_id: &ConversationId,
    ) -> BoxFuture<'_, Result<Conversation>>;

    /// Create a new, empty conversation for a document.
    fn create_conversation(&self, document_id: &DocumentId)
    -> BoxFuture<'_, Result<ConversationId>>;

    /// Trigger an assistant turn. The resulting log is obtained by a
    /// subsequent [`Backend::get_conversation`].
    fn submit_prompt(&self, request: &PromptRequest) -> BoxFuture<'_, Result<()>>;

    /// Remove the message history of the given conversations.
    fn delete_history(&self, conversation_ids: &[ConversationId]) -> BoxFuture<'_, Result<()>>;

    /// Remove the given conversations and the document itself.
    fn delete_full(
        &self,
        conversation_ids: &[ConversationId],
        document_id: &DocumentId,
    ) -> BoxFuture<'_, Result<()>>;
}
