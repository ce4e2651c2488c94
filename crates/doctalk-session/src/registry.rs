//! The documents available to the user, independent of any conversation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use doctalk_client::Backend;
use doctalk_core::ids::DocumentId;
use doctalk_core::models::document::Document;

use crate::error::SessionError;

pub struct DocumentRegistry {
    backend: Arc<dyn Backend>,
    documents: Mutex<Vec<Document>>,
}

impl DocumentRegistry {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            documents: Mutex::new(Vec::new()),
        }
    }

    fn documents_mut(&self) -> MutexGuard<'_, Vec<Document>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the local list with the backend's current one.
    ///
    /// There is no per-item merge. When refreshes overlap, whichever
    /// response resolves last is what remains.
    pub async fn refresh(&self) -> Result<Vec<Document>, SessionError> {
        let documents = self.backend.list_documents().await?;
        info!(count = documents.len(), "document list refreshed");
        *self.documents_mut() = documents.clone();
        Ok(documents)
    }

    pub fn documents(&self) -> Vec<Document> {
        self.documents_mut().clone()
    }

    pub fn get(&self, document_id: &DocumentId) -> Option<Document> {
        self.documents_mut()
            .iter()
            .find(|d| &d.id == document_id)
            .cloned()
    }

    /// Drop a document locally, ahead of the next refresh. Returns whether
    /// it was listed.
    pub fn prune(&self, document_id: &DocumentId) -> bool {
        let mut documents = self.documents_mut();
        let before = documents.len();
        documents.retain(|d| &d.id != document_id);
        documents.len() != before
    }
}
