//! An in-memory backend for driving REPL commands end to end.
//!
//! Conversation ids are `c1`, `c2`, ... in creation order. Uploaded files
//! show up in the listing as processing documents named after the file.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use doctalk_client::{Backend, BoxFuture, ClientError, PromptRequest};
use doctalk_core::ids::{ConversationId, DocumentId};
use doctalk_core::models::conversation::Conversation;
use doctalk_core::models::document::{Document, DocumentStatus};
use doctalk_core::models::message::{Message, Role};

const UPLOAD_PREFIX: &str = "mem://uploads/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Presign(String),
    Put { url: String, content_type: String },
    List,
    Get(DocumentId, ConversationId),
    Create(DocumentId),
    Submit(PromptRequest),
    DeleteHistory(Vec<ConversationId>),
    DeleteFull(Vec<ConversationId>, DocumentId),
}

#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    documents: Mutex<BTreeMap<DocumentId, Document>>,
    logs: Mutex<HashMap<ConversationId, Vec<(Role, String)>>>,
    next_id: Mutex<usize>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_document(&self, id: &str, name: &str, status: DocumentStatus) {
        let document = Document {
            id: DocumentId::new(id),
            name: name.to_string(),
            uri: None,
            status,
            size: Some(2048),
            created: None,
            conversations: Vec::new(),
        };
        self.documents.lock().unwrap().insert(document.id.clone(), document);
    }

    /// Add a conversation with the next sequential id and return it.
    pub fn add_conversation(&self, document_id: &str, log: &[(Role, &str)]) -> ConversationId {
        let id = self.mint();
        if let Some(d) = self.documents.lock().unwrap().get_mut(&DocumentId::new(document_id)) {
            d.conversations.push(id.clone());
        }
        self.logs.lock().unwrap().insert(
            id.clone(),
            log.iter().map(|(r, c)| (*r, c.to_string())).collect(),
        );
        id
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub fn document(&self, id: &str) -> Option<Document> {
        self.documents.lock().unwrap().get(&DocumentId::new(id)).cloned()
    }

    fn mint(&self) -> ConversationId {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        ConversationId::new(format!("c{next}"))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Poll `condition` until it holds, failing the test after a few seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}

fn not_found(path: String) -> ClientError {
    ClientError::NotFound(path)
}

impl Backend for FakeBackend {
    fn presigned_url(&self, file_name: &str) -> BoxFuture<'_, Result<String, ClientError>> {
        let file_name = file_name.to_string();
        Box::pin(async move {
            self.record(Call::Presign(file_name.clone()));
            Ok(format!("{UPLOAD_PREFIX}{file_name}"))
        })
    }

    fn put_object(
        &self,
        url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        let url = url.to_string();
        let content_type = content_type.to_string();
        Box::pin(async move {
            self.record(Call::Put {
                url: url.clone(),
                content_type,
            });
            let name = url
                .strip_prefix(UPLOAD_PREFIX)
                .ok_or_else(|| ClientError::Transfer(format!("unknown url {url}")))?;
            let id = format!("u-{name}");
            self.add_document(&id, name, DocumentStatus::Processing);
            if let Some(d) = self.documents.lock().unwrap().get_mut(&DocumentId::new(id)) {
                d.size = Some(bytes.len() as u64);
            }
            Ok(())
        })
    }

    fn list_documents(&self) -> BoxFuture<'_, Result<Vec<Document>, ClientError>> {
        Box::pin(async move {
            self.record(Call::List);
            Ok(self.documents.lock().unwrap().values().cloned().collect())
        })
    }

    fn get_conversation(
        &self,
        document_id: &DocumentId,
        conversation_id: &ConversationId,
    ) -> BoxFuture<'_, Result<Conversation, ClientError>> {
        let document_id = document_id.clone();
        let conversation_id = conversation_id.clone();
        Box::pin(async move {
            self.record(Call::Get(document_id.clone(), conversation_id.clone()));
            let document = self
                .documents
                .lock()
                .unwrap()
                .get(&document_id)
                .cloned()
                .ok_or_else(|| not_found(format!("/doc/{document_id}")))?;
            let log = self
                .logs
                .lock()
                .unwrap()
                .get(&conversation_id)
                .cloned()
                .ok_or_else(|| not_found(format!("/doc/{document_id}/{conversation_id}")))?;
            Ok(Conversation {
                id: conversation_id,
                document,
                messages: log
                    .into_iter()
                    .enumerate()
                    .map(|(i, (role, content))| Message::confirmed(role, content, i))
                    .collect(),
            })
        })
    }

    fn create_conversation(
        &self,
        document_id: &DocumentId,
    ) -> BoxFuture<'_, Result<ConversationId, ClientError>> {
        let document_id = document_id.clone();
        Box::pin(async move {
            self.record(Call::Create(document_id.clone()));
            if !self.documents.lock().unwrap().contains_key(&document_id) {
                return Err(not_found(format!("/doc/{document_id}")));
            }
            Ok(self.add_conversation(document_id.as_str(), &[]))
        })
    }

    fn submit_prompt(&self, request: &PromptRequest) -> BoxFuture<'_, Result<(), ClientError>> {
        let request = request.clone();
        Box::pin(async move {
            self.record(Call::Submit(request.clone()));
            let mut logs = self.logs.lock().unwrap();
            let log = logs.get_mut(&request.conversation_id).ok_or_else(|| {
                not_found(format!("/{}/{}", request.document_id, request.conversation_id))
            })?;
            log.push((Role::User, request.prompt.clone()));
            log.push((Role::Assistant, format!("answer: {}", request.prompt)));
            Ok(())
        })
    }

    fn delete_history(
        &self,
        conversation_ids: &[ConversationId],
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        let ids = conversation_ids.to_vec();
        Box::pin(async move {
            self.record(Call::DeleteHistory(ids.clone()));
            let mut logs = self.logs.lock().unwrap();
            for id in &ids {
                if let Some(log) = logs.get_mut(id) {
                    log.clear();
                }
            }
            Ok(())
        })
    }

    fn delete_full(
        &self,
        conversation_ids: &[ConversationId],
        document_id: &DocumentId,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        let ids = conversation_ids.to_vec();
        let document_id = document_id.clone();
        Box::pin(async move {
            self.record(Call::DeleteFull(ids.clone(), document_id.clone()));
            let mut logs = self.logs.lock().unwrap();
            for id in &ids {
                logs.remove(id);
            }
            self.documents.lock().unwrap().remove(&document_id);
            Ok(())
        })
    }
}
