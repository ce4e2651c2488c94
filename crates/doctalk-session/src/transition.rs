//! Pure state transitions of a conversation session.
//!
//! Every operation is split in two: a `begin_*` transition that validates
//! preconditions, applies the synchronous part (such as the optimistic
//! message) and hands out a [`Ticket`]; and a `finish_*` transition that
//! applies the backend's result. A ticket whose generation is no longer
//! current is discarded without touching state.
//!
//! Nothing in this module performs I/O.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use doctalk_client::PromptRequest;
use doctalk_core::ids::{ConversationId, DocumentId};
use doctalk_core::models::conversation::Conversation;
use doctalk_core::models::message::Message;

use crate::error::{Failure, SessionError};

// ── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SessionStatus {
    /// No conversation loaded.
    Idle,
    Loading,
    Ready,
    Submitting,
    Error,
}

/// The backend operation a session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PendingOp {
    Load,
    Submit,
    DeleteHistory,
    DeleteFull,
}

impl PendingOp {
    fn label(self) -> &'static str {
        match self {
            PendingOp::Load => "load",
            PendingOp::Submit => "submit",
            PendingOp::DeleteHistory => "history delete",
            PendingOp::DeleteFull => "conversation delete",
        }
    }
}

/// Whether a completion was applied or dropped as stale.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Discarded,
}

/// Stamp of one in-flight operation: the generation it was started under
/// and the conversation it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub document_id: DocumentId,
    pub conversation_id: ConversationId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTicket {
    pub stamp: Ticket,
    pub request: PromptRequest,
}

/// Everything the presenter needs to render one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub pending: Option<PendingOp>,
    pub document_id: Option<DocumentId>,
    pub conversation_id: Option<ConversationId>,
    pub file_name: Option<String>,
    pub messages: Vec<Message>,
    pub prompt: String,
    pub model_id: String,
    pub language: String,
    pub last_error: Option<Failure>,
}

// ── State ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionState {
    status: SessionStatus,
    pending: Option<PendingOp>,
    generation: u64,
    document_id: Option<DocumentId>,
    conversation_id: Option<ConversationId>,
    file_name: Option<String>,
    messages: Vec<Message>,
    prompt: String,
    model_id: String,
    language: String,
    last_error: Option<Failure>,
    /// Conversations whose full delete is in flight.
    deleting: HashSet<ConversationId>,
    /// Conversations the backend confirmed as deleted.
    deleted: HashSet<ConversationId>,
}

impl SessionState {
    pub fn new(model_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Idle,
            pending: None,
            generation: 0,
            document_id: None,
            conversation_id: None,
            file_name: None,
            messages: Vec::new(),
            prompt: String::new(),
            model_id: model_id.into(),
            language: language.into(),
            last_error: None,
            deleting: HashSet::new(),
            deleted: HashSet::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn pending(&self) -> Option<PendingOp> {
        self.pending
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn document_id(&self) -> Option<&DocumentId> {
        self.document_id.as_ref()
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation_id.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            pending: self.pending,
            document_id: self.document_id.clone(),
            conversation_id: self.conversation_id.clone(),
            file_name: self.file_name.clone(),
            messages: self.messages.clone(),
            prompt: self.prompt.clone(),
            model_id: self.model_id.clone(),
            language: self.language.clone(),
            last_error: self.last_error.clone(),
        }
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_model(&mut self, model_id: impl Into<String>) {
        self.model_id = model_id.into();
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    fn ensure_not_pending(&self) -> Result<(), SessionError> {
        match self.pending {
            Some(op) => Err(SessionError::AlreadyInProgress(op.label())),
            None => Ok(()),
        }
    }

    fn next_ticket(&mut self, document_id: DocumentId, conversation_id: ConversationId) -> Ticket {
        self.generation += 1;
        Ticket {
            generation: self.generation,
            document_id,
            conversation_id,
        }
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
    }

    fn fail(&mut self, error: &SessionError) {
        self.status = SessionStatus::Error;
        self.pending = None;
        self.last_error = Some(Failure::from(error));
    }

    // ── Load / switch ────────────────────────────────────────────────────────

    /// Start fetching a conversation. The loaded log, ids and file name stay
    /// as they are until the fetch succeeds.
    pub fn begin_load(
        &mut self,
        document_id: DocumentId,
        conversation_id: ConversationId,
    ) -> Result<Ticket, SessionError> {
        self.ensure_not_pending()?;
        self.status = SessionStatus::Loading;
        self.pending = Some(PendingOp::Load);
        Ok(self.next_ticket(document_id, conversation_id))
    }

    /// Re-fetch the conversation currently bound to the session.
    pub fn begin_reload(&mut self) -> Result<Ticket, SessionError> {
        let (document_id, conversation_id) = self.bound_ids()?;
        self.begin_load(document_id, conversation_id)
    }

    /// Load another conversation of the same document. Refused while a
    /// submit is in flight, since its reply is bound to the current
    /// conversation.
    pub fn begin_switch(&mut self, conversation_id: ConversationId) -> Result<Ticket, SessionError> {
        if self.pending == Some(PendingOp::Submit) {
            return Err(SessionError::AlreadyInProgress(PendingOp::Submit.label()));
        }
        let document_id = self
            .document_id
            .clone()
            .ok_or_else(|| SessionError::InvalidState("no document is open".to_string()))?;
        self.begin_load(document_id, conversation_id)
    }

    pub fn finish_load(
        &mut self,
        ticket: &Ticket,
        result: Result<Conversation, SessionError>,
    ) -> Result<Completion, SessionError> {
        if !self.is_current(ticket) {
            return Ok(Completion::Discarded);
        }

        match result {
            Ok(conversation) => {
                self.bind(ticket, conversation);
                Ok(Completion::Applied)
            }
            Err(e) => {
                // Prior log and ids are kept so a transient failure does not
                // blank a ready chat.
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn bind(&mut self, ticket: &Ticket, conversation: Conversation) {
        if self.conversation_id.as_ref() != Some(&ticket.conversation_id) {
            self.prompt.clear();
        }
        self.document_id = Some(ticket.document_id.clone());
        self.conversation_id = Some(ticket.conversation_id.clone());
        self.file_name = Some(conversation.file_name().to_string());
        self.messages = conversation.messages;
        self.status = SessionStatus::Ready;
        self.pending = None;
        self.last_error = None;
    }

    fn bound_ids(&self) -> Result<(DocumentId, ConversationId), SessionError> {
        match (&self.document_id, &self.conversation_id) {
            (Some(d), Some(c)) => Ok((d.clone(), c.clone())),
            _ => Err(SessionError::InvalidState(
                "no conversation is loaded".to_string(),
            )),
        }
    }

    // ── Submit ───────────────────────────────────────────────────────────────

    /// Validate a prompt, append it as an optimistic message and move to
    /// `Submitting`. Rejections leave the state untouched.
    pub fn begin_submit(
        &mut self,
        prompt: &str,
        model_id: &str,
        language: &str,
    ) -> Result<SubmitTicket, SessionError> {
        self.ensure_not_pending()?;
        if self.status != SessionStatus::Ready {
            return Err(SessionError::InvalidState(format!(
                "cannot submit while {:?}",
                self.status
            )));
        }
        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyPrompt);
        }
        let (document_id, conversation_id) = self.bound_ids()?;
        let file_name = self.file_name.clone().unwrap_or_default();

        self.model_id = model_id.to_string();
        self.language = language.to_string();
        self.messages
            .push(Message::optimistic(prompt, self.messages.len()));
        self.status = SessionStatus::Submitting;
        self.pending = Some(PendingOp::Submit);
        self.last_error = None;

        let stamp = self.next_ticket(document_id.clone(), conversation_id.clone());
        Ok(SubmitTicket {
            stamp,
            request: PromptRequest {
                document_id,
                conversation_id,
                file_name,
                prompt: prompt.to_string(),
                model_id: model_id.to_string(),
                language: language.to_string(),
            },
        })
    }

    /// Apply the outcome of a submit. On success the fetched log replaces the
    /// local one wholesale; on failure the optimistic message stays.
    pub fn finish_submit(
        &mut self,
        ticket: &Ticket,
        result: Result<Conversation, SessionError>,
    ) -> Result<Completion, SessionError> {
        if !self.is_current(ticket) {
            return Ok(Completion::Discarded);
        }

        match result {
            Ok(conversation) => {
                self.messages = conversation.messages;
                self.file_name = Some(conversation.document.name);
                self.prompt.clear();
                self.status = SessionStatus::Ready;
                self.pending = None;
                self.last_error = None;
                Ok(Completion::Applied)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    // ── Deletes ──────────────────────────────────────────────────────────────

    pub fn begin_delete_history(
        &mut self,
        conversation_id: ConversationId,
    ) -> Result<Ticket, SessionError> {
        self.ensure_not_pending()?;
        let document_id = self
            .document_id
            .clone()
            .ok_or_else(|| SessionError::InvalidState("no document is open".to_string()))?;
        self.pending = Some(PendingOp::DeleteHistory);
        Ok(self.next_ticket(document_id, conversation_id))
    }

    /// On success the local log is emptied if the cleared conversation is
    /// the one on screen; the conversation stays bound either way.
    pub fn finish_delete_history(
        &mut self,
        ticket: &Ticket,
        result: Result<(), SessionError>,
    ) -> Result<Completion, SessionError> {
        if !self.is_current(ticket) {
            return Ok(Completion::Discarded);
        }

        match result {
            Ok(()) => {
                if self.conversation_id.as_ref() == Some(&ticket.conversation_id) {
                    self.messages.clear();
                    self.status = SessionStatus::Ready;
                    self.last_error = None;
                }
                self.pending = None;
                Ok(Completion::Applied)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Accept a full delete exactly once per conversation. A repeated call
    /// is refused while the first is in flight, and reported as not found
    /// once it succeeded.
    pub fn begin_delete_full(
        &mut self,
        conversation_id: ConversationId,
        document_id: DocumentId,
    ) -> Result<Ticket, SessionError> {
        if self.deleted.contains(&conversation_id) {
            return Err(SessionError::NotFound(format!(
                "conversation {conversation_id} was already deleted"
            )));
        }
        if self.deleting.contains(&conversation_id) {
            return Err(SessionError::AlreadyInProgress(PendingOp::DeleteFull.label()));
        }
        self.ensure_not_pending()?;
        self.deleting.insert(conversation_id.clone());
        self.pending = Some(PendingOp::DeleteFull);
        Ok(self.next_ticket(document_id, conversation_id))
    }

    /// On success a session showing the deleted conversation or document
    /// returns to `Idle`.
    pub fn finish_delete_full(
        &mut self,
        ticket: &Ticket,
        result: Result<(), SessionError>,
    ) -> Result<Completion, SessionError> {
        // The backend's answer holds even when the ticket is stale.
        self.deleting.remove(&ticket.conversation_id);
        if result.is_ok() {
            self.deleted.insert(ticket.conversation_id.clone());
        }
        if !self.is_current(ticket) {
            return Ok(Completion::Discarded);
        }

        match result {
            Ok(()) => {
                let shows_deleted = self.conversation_id.as_ref() == Some(&ticket.conversation_id)
                    || self.document_id.as_ref() == Some(&ticket.document_id);
                if shows_deleted {
                    self.unbind();
                } else {
                    self.pending = None;
                }
                Ok(Completion::Applied)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    // ── Close ────────────────────────────────────────────────────────────────

    /// Return to `Idle`. Completions of anything still in flight will be
    /// discarded; the requests themselves are not aborted.
    pub fn close(&mut self) {
        self.generation += 1;
        self.unbind();
    }

    fn unbind(&mut self) {
        self.status = SessionStatus::Idle;
        self.pending = None;
        self.document_id = None;
        self.conversation_id = None;
        self.file_name = None;
        self.messages.clear();
        self.prompt.clear();
        self.last_error = None;
    }
}
