//! Which conversations exist for each document, and which one is active.
//!
//! This is the explicit context object for "the current conversation"; there
//! is no ambient global holding it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use doctalk_client::Backend;
use doctalk_core::ids::{ConversationId, DocumentId};
use doctalk_core::models::document::Document;

use crate::error::SessionError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DirectoryEntry {
    /// Oldest first.
    pub conversation_ids: Vec<ConversationId>,
    /// Always one of `conversation_ids` when set.
    pub active: Option<ConversationId>,
}

pub struct SessionDirectory {
    backend: Arc<dyn Backend>,
    entries: Mutex<BTreeMap<DocumentId, DirectoryEntry>>,
}

impl SessionDirectory {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<DocumentId, DirectoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a brand-new conversation for the document. Never reuses an
    /// existing one.
    pub async fn create(&self, document_id: &DocumentId) -> Result<ConversationId, SessionError> {
        let conversation_id = self.backend.create_conversation(document_id).await?;

        info!(
            document_id = %document_id,
            conversation_id = %conversation_id,
            "conversation created"
        );

        let mut entries = self.entries();
        let entry = entries.entry(document_id.clone()).or_default();
        if !entry.conversation_ids.contains(&conversation_id) {
            entry.conversation_ids.push(conversation_id.clone());
        }
        Ok(conversation_id)
    }

    pub fn list(&self, document_id: &DocumentId) -> Vec<ConversationId> {
        self.entries()
            .get(document_id)
            .map(|e| e.conversation_ids.clone())
            .unwrap_or_default()
    }

    pub fn set_active(
        &self,
        document_id: &DocumentId,
        conversation_id: &ConversationId,
    ) -> Result<(), SessionError> {
        let mut entries = self.entries();
        let entry = entries
            .get_mut(document_id)
            .filter(|e| e.conversation_ids.contains(conversation_id))
            .ok_or_else(|| {
                SessionError::NotFound(format!(
                    "conversation {conversation_id} of document {document_id}"
                ))
            })?;
        entry.active = Some(conversation_id.clone());
        Ok(())
    }

    pub fn active(&self, document_id: &DocumentId) -> Option<ConversationId> {
        self.entries()
            .get(document_id)
            .and_then(|e| e.active.clone())
    }

    pub fn entry(&self, document_id: &DocumentId) -> Option<DirectoryEntry> {
        self.entries().get(document_id).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<DocumentId, DirectoryEntry> {
        self.entries().clone()
    }

    /// Forget a deleted conversation. Clears `active` in the same step if it
    /// pointed at it. Returns whether the conversation was known.
    pub fn remove_conversation(
        &self,
        document_id: &DocumentId,
        conversation_id: &ConversationId,
    ) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(document_id) else {
            return false;
        };
        let before = entry.conversation_ids.len();
        entry.conversation_ids.retain(|c| c != conversation_id);
        if entry.active.as_ref() == Some(conversation_id) {
            entry.active = None;
        }
        entry.conversation_ids.len() != before
    }

    /// Forget a deleted document and, with it, its active pointer.
    pub fn remove_document(&self, document_id: &DocumentId) -> Option<DirectoryEntry> {
        let removed = self.entries().remove(document_id);
        if removed.is_some() {
            info!(document_id = %document_id, "directory entry removed");
        }
        removed
    }

    /// Reconcile with a fresh document listing.
    ///
    /// Entries of documents no longer listed are dropped. Conversations the
    /// listing reports are added after the ones already known; local order
    /// and the active pointer are kept.
    ///
    /// Known conversations are never dropped here. A listing fetched before
    /// a `create` resolved does not report the new conversation yet, and a
    /// conversation only goes away with its document, through
    /// [`Self::remove_document`] or the document leaving the listing.
    pub fn hydrate(&self, documents: &[Document]) {
        let mut entries = self.entries();
        entries.retain(|id, _| documents.iter().any(|d| &d.id == id));

        for document in documents {
            let entry = entries.entry(document.id.clone()).or_default();
            for conversation_id in &document.conversations {
                if !entry.conversation_ids.contains(conversation_id) {
                    entry.conversation_ids.push(conversation_id.clone());
                }
            }
        }
    }
}
