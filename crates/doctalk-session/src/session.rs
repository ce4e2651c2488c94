//! One active conversation: its message log, pending request and
//! model/language selection, plus every backend call made on its behalf.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use doctalk_client::{Backend, PromptRequest};
use doctalk_core::ids::{ConversationId, DocumentId};
use doctalk_core::models::conversation::Conversation;

use crate::directory::SessionDirectory;
use crate::error::SessionError;
use crate::registry::DocumentRegistry;
use crate::transition::{
    Completion, SessionSnapshot, SessionState, SessionStatus, SubmitTicket, Ticket,
};

pub struct ConversationSession {
    backend: Arc<dyn Backend>,
    state: Mutex<SessionState>,
}

impl ConversationSession {
    pub fn new(
        backend: Arc<dyn Backend>,
        model_id: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            state: Mutex::new(SessionState::new(model_id, language)),
        }
    }

    /// The guard is never held across an `.await`.
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state().snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.state().status()
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        self.state().set_prompt(prompt);
    }

    pub fn set_model(&self, model_id: impl Into<String>) {
        self.state().set_model(model_id);
    }

    pub fn set_language(&self, language: impl Into<String>) {
        self.state().set_language(language);
    }

    // ── Load / switch ────────────────────────────────────────────────────────

    /// Fetch a conversation and make its log the session's ground truth.
    pub async fn load(
        &self,
        document_id: &DocumentId,
        conversation_id: &ConversationId,
    ) -> Result<Completion, SessionError> {
        let ticket = self
            .state()
            .begin_load(document_id.clone(), conversation_id.clone())?;
        self.run_load(ticket).await
    }

    /// Re-fetch the bound conversation; the retry path after an error.
    pub async fn reload(&self) -> Result<Completion, SessionError> {
        let ticket = self.state().begin_reload()?;
        self.run_load(ticket).await
    }

    /// Load another conversation of the open document.
    pub async fn switch_to(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Completion, SessionError> {
        let ticket = self.state().begin_switch(conversation_id.clone())?;
        self.run_load(ticket).await
    }

    async fn run_load(&self, ticket: Ticket) -> Result<Completion, SessionError> {
        info!(
            document_id = %ticket.document_id,
            conversation_id = %ticket.conversation_id,
            generation = ticket.generation,
            "loading conversation"
        );

        let result = self
            .backend
            .get_conversation(&ticket.document_id, &ticket.conversation_id)
            .await
            .map_err(SessionError::from);

        if let Err(e) = &result {
            warn!(conversation_id = %ticket.conversation_id, error = %e, "conversation load failed");
        }

        let completion = self.state().finish_load(&ticket, result)?;
        log_discarded(completion, &ticket, "load");
        Ok(completion)
    }

    // ── Submit ───────────────────────────────────────────────────────────────

    /// Submit a prompt: optimistic append, backend turn, then wholesale
    /// replacement of the log by the re-fetched authoritative one.
    pub async fn submit(
        &self,
        prompt: &str,
        model_id: &str,
        language: &str,
    ) -> Result<Completion, SessionError> {
        let ticket = self.begin_submit(prompt, model_id, language)?;
        self.complete_submit(ticket).await
    }

    /// Submit the prompt buffer with the current model/language selection.
    pub async fn submit_prompt(&self) -> Result<Completion, SessionError> {
        let ticket = {
            let mut state = self.state();
            let snapshot = state.snapshot();
            state.begin_submit(&snapshot.prompt, &snapshot.model_id, &snapshot.language)?
        };
        self.complete_submit(ticket).await
    }

    /// The synchronous half of a submit. The optimistic message is in the
    /// log by the time this returns.
    pub fn begin_submit(
        &self,
        prompt: &str,
        model_id: &str,
        language: &str,
    ) -> Result<SubmitTicket, SessionError> {
        self.state().begin_submit(prompt, model_id, language)
    }

    /// The effect half of a submit: one backend turn, then the re-fetch.
    pub async fn complete_submit(&self, ticket: SubmitTicket) -> Result<Completion, SessionError> {
        let SubmitTicket { stamp, request } = ticket;

        info!(
            document_id = %request.document_id,
            conversation_id = %request.conversation_id,
            model_id = %request.model_id,
            language = %request.language,
            generation = stamp.generation,
            "submitting prompt"
        );

        let result = self.run_turn(&request).await;
        if let Err(e) = &result {
            warn!(conversation_id = %request.conversation_id, error = %e, "prompt submission failed");
        }

        let completion = self.state().finish_submit(&stamp, result)?;
        log_discarded(completion, &stamp, "submit");
        Ok(completion)
    }

    async fn run_turn(&self, request: &PromptRequest) -> Result<Conversation, SessionError> {
        self.backend.submit_prompt(request).await?;
        let conversation = self
            .backend
            .get_conversation(&request.document_id, &request.conversation_id)
            .await?;
        Ok(conversation)
    }

    // ── Deletes ──────────────────────────────────────────────────────────────

    /// Remove a conversation's message history, keeping the conversation.
    pub async fn delete_history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Completion, SessionError> {
        let ticket = self.state().begin_delete_history(conversation_id.clone())?;

        info!(conversation_id = %conversation_id, "deleting conversation history");

        let result = self
            .backend
            .delete_history(std::slice::from_ref(conversation_id))
            .await
            .map_err(SessionError::from);

        if let Err(e) = &result {
            warn!(conversation_id = %conversation_id, error = %e, "history delete failed");
        }

        let completion = self.state().finish_delete_history(&ticket, result)?;
        log_discarded(completion, &ticket, "history delete");
        Ok(completion)
    }

    /// Irreversibly delete a conversation together with its document.
    ///
    /// The directory entry for the document is dropped in the same step that
    /// observes the backend's acknowledgement; the registry is then refreshed
    /// from the backend. Confirmation is the caller's job.
    pub async fn delete_conversation_and_document(
        &self,
        conversation_id: &ConversationId,
        document_id: &DocumentId,
        registry: &DocumentRegistry,
        directory: &SessionDirectory,
    ) -> Result<Completion, SessionError> {
        let ticket = self
            .state()
            .begin_delete_full(conversation_id.clone(), document_id.clone())?;

        info!(
            document_id = %document_id,
            conversation_id = %conversation_id,
            "deleting conversation and document"
        );

        let result = self
            .backend
            .delete_full(std::slice::from_ref(conversation_id), document_id)
            .await
            .map_err(SessionError::from);

        match &result {
            Ok(()) => {
                directory.remove_document(document_id);
                registry.prune(document_id);
            }
            Err(e) => {
                warn!(document_id = %document_id, error = %e, "full delete failed");
            }
        }

        let completion = self.state().finish_delete_full(&ticket, result)?;
        log_discarded(completion, &ticket, "conversation delete");

        let documents = registry.refresh().await?;
        directory.hydrate(&documents);

        Ok(completion)
    }

    /// Stop listening for in-flight results and return to `Idle`.
    pub fn close(&self) {
        let mut state = self.state();
        state.close();
        info!(generation = state.generation(), "session closed");
    }
}

fn log_discarded(completion: Completion, ticket: &Ticket, op: &str) {
    if completion == Completion::Discarded {
        warn!(
            op,
            conversation_id = %ticket.conversation_id,
            generation = ticket.generation,
            "discarding stale completion"
        );
    }
}
