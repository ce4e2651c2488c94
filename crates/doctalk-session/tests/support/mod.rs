//! In-memory backend for session tests.
//!
//! Records every call in order, can be told to fail an operation, and can
//! hold an operation open until the test releases it. Listings are read when
//! the call arrives, so a held listing answers with the data of that moment.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use doctalk_client::{Backend, BoxFuture, ClientError, PromptRequest};
use doctalk_core::ids::{ConversationId, DocumentId};
use doctalk_core::models::conversation::Conversation;
use doctalk_core::models::document::{Document, DocumentStatus};
use doctalk_core::models::message::{Message, Role};

pub const MODEL: &str = "anthropic.claude-v2:1";
pub const LANG: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Presign,
    Put,
    List,
    Get,
    Create,
    Submit,
    DeleteHistory,
    DeleteFull,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Presign(String),
    Put {
        url: String,
        content_type: String,
        size: usize,
    },
    List,
    Get(DocumentId, ConversationId),
    Create(DocumentId),
    Submit(PromptRequest),
    DeleteHistory(Vec<ConversationId>),
    DeleteFull(Vec<ConversationId>, DocumentId),
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Presign(_) => Op::Presign,
            Call::Put { .. } => Op::Put,
            Call::List => Op::List,
            Call::Get(..) => Op::Get,
            Call::Create(_) => Op::Create,
            Call::Submit(_) => Op::Submit,
            Call::DeleteHistory(_) => Op::DeleteHistory,
            Call::DeleteFull(..) => Op::DeleteFull,
        }
    }
}

#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    documents: Mutex<BTreeMap<DocumentId, Document>>,
    logs: Mutex<HashMap<ConversationId, Vec<(Role, String)>>>,
    failing: Mutex<HashSet<Op>>,
    gates: Mutex<HashMap<Op, Arc<Notify>>>,
    /// One-shot gates, taken by the next calls of an op in arrival order.
    queued: Mutex<HashMap<Op, VecDeque<Arc<Notify>>>>,
    /// Assistant replies are `"{prefix}{prompt}"`.
    reply_prefix: Mutex<String>,
}

pub fn doc(id: &str) -> DocumentId {
    DocumentId::new(id)
}

pub fn conv(id: &str) -> ConversationId {
    ConversationId::new(id)
}

pub fn file(name: &str, content_type: &str, bytes: &[u8]) -> doctalk_core::models::upload::UploadFile {
    doctalk_core::models::upload::UploadFile::new(name, content_type, bytes.to_vec())
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        *backend.reply_prefix.lock().unwrap() = "answer: ".to_string();
        Arc::new(backend)
    }

    pub fn add_document(&self, id: &str, name: &str) {
        self.documents.lock().unwrap().insert(
            doc(id),
            Document {
                id: doc(id),
                name: name.to_string(),
                uri: None,
                status: DocumentStatus::Ready,
                size: Some(1024),
                created: None,
                conversations: Vec::new(),
            },
        );
    }

    pub fn add_conversation(&self, document_id: &str, conversation_id: &str, log: &[(Role, &str)]) {
        if let Some(d) = self.documents.lock().unwrap().get_mut(&doc(document_id)) {
            d.conversations.push(conv(conversation_id));
        }
        self.logs.lock().unwrap().insert(
            conv(conversation_id),
            log.iter().map(|(r, c)| (*r, c.to_string())).collect(),
        );
    }

    pub fn set_failing(&self, op: Op, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(op);
        } else {
            set.remove(&op);
        }
    }

    /// Block every call of `op` until the returned gate is notified.
    pub fn hold(&self, op: Op) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(op, gate.clone());
        gate
    }

    /// Hold the next `n` calls of `op`, each behind its own gate, so a test
    /// can resolve them in any order.
    pub fn hold_calls(&self, op: Op, n: usize) -> Vec<Arc<Notify>> {
        let gates: Vec<_> = (0..n).map(|_| Arc::new(Notify::new())).collect();
        self.queued
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .extend(gates.iter().cloned());
        gates
    }

    pub fn release(&self, op: Op) {
        if let Some(gate) = self.gates.lock().unwrap().remove(&op) {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.calls().iter().map(Call::op).collect()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    pub fn log(&self, conversation_id: &str) -> Vec<(Role, String)> {
        self.logs
            .lock()
            .unwrap()
            .get(&conv(conversation_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Wait until `op` has been called at least `n` times.
    pub async fn wait_for(&self, op: Op, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.count(op) < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("backend call never arrived");
    }

    fn record(&self, call: Call) -> Op {
        let op = call.op();
        self.calls.lock().unwrap().push(call);
        op
    }

    async fn pass(&self, op: Op) -> Result<(), ClientError> {
        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        let gate = queued.or_else(|| self.gates.lock().unwrap().get(&op).cloned());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.lock().unwrap().contains(&op) {
            return Err(match op {
                Op::Put => ClientError::Transfer("connection reset".to_string()),
                _ => ClientError::Api {
                    status: 503,
                    message: "service unavailable".to_string(),
                },
            });
        }
        Ok(())
    }

    fn conversation(
        &self,
        document_id: &DocumentId,
        conversation_id: &ConversationId,
    ) -> Result<Conversation, ClientError> {
        let document = self
            .documents
            .lock()
            .unwrap()
            .get(document_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("/doc/{document_id}")))?;
        let log = self
            .logs
            .lock()
            .unwrap()
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("/doc/{document_id}/{conversation_id}")))?;

        Ok(Conversation {
            id: conversation_id.clone(),
            document,
            messages: log
                .into_iter()
                .enumerate()
                .map(|(i, (role, content))| Message::confirmed(role, content, i))
                .collect(),
        })
    }
}

impl Backend for MockBackend {
    fn presigned_url(&self, file_name: &str) -> BoxFuture<'_, Result<String, ClientError>> {
        let file_name = file_name.to_string();
        Box::pin(async move {
            let op = self.record(Call::Presign(file_name.clone()));
            self.pass(op).await?;
            Ok(format!("https://storage.test/uploads/{file_name}?sig=abc"))
        })
    }

    fn put_object(
        &self,
        url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        let call = Call::Put {
            url: url.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        };
        Box::pin(async move {
            let op = self.record(call);
            self.pass(op).await
        })
    }

    fn list_documents(&self) -> BoxFuture<'_, Result<Vec<Document>, ClientError>> {
        Box::pin(async move {
            let op = self.record(Call::List);
            let listing: Vec<Document> = self.documents.lock().unwrap().values().cloned().collect();
            self.pass(op).await?;
            Ok(listing)
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
            let op = self.record(Call::Get(document_id.clone(), conversation_id.clone()));
            self.pass(op).await?;
            self.conversation(&document_id, &conversation_id)
        })
    }

    fn create_conversation(
        &self,
        document_id: &DocumentId,
    ) -> BoxFuture<'_, Result<ConversationId, ClientError>> {
        let document_id = document_id.clone();
        Box::pin(async move {
            let op = self.record(Call::Create(document_id.clone()));
            self.pass(op).await?;
            let id = ConversationId::new(uuid::Uuid::new_v4().to_string());
            let mut documents = self.documents.lock().unwrap();
            let document = documents
                .get_mut(&document_id)
                .ok_or_else(|| ClientError::NotFound(format!("/doc/{document_id}")))?;
            document.conversations.push(id.clone());
            self.logs.lock().unwrap().insert(id.clone(), Vec::new());
            Ok(id)
        })
    }

    fn submit_prompt(&self, request: &PromptRequest) -> BoxFuture<'_, Result<(), ClientError>> {
        let request = request.clone();
        Box::pin(async move {
            let op = self.record(Call::Submit(request.clone()));
            self.pass(op).await?;
            let reply = format!("{}{}", self.reply_prefix.lock().unwrap(), request.prompt);
            let mut logs = self.logs.lock().unwrap();
            let log = logs.get_mut(&request.conversation_id).ok_or_else(|| {
                ClientError::NotFound(format!("/{}/{}", request.document_id, request.conversation_id))
            })?;
            log.push((Role::User, request.prompt.clone()));
            log.push((Role::Assistant, reply));
            Ok(())
        })
    }

    fn delete_history(
        &self,
        conversation_ids: &[ConversationId],
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        let ids = conversation_ids.to_vec();
        Box::pin(async move {
            let op = self.record(Call::DeleteHistory(ids.clone()));
            self.pass(op).await?;
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
            let op = self.record(Call::DeleteFull(ids.clone(), document_id.clone()));
            self.pass(op).await?;
            let mut logs = self.logs.lock().unwrap();
            for id in &ids {
                logs.remove(id);
            }
            self.documents.lock().unwrap().remove(&document_id);
            Ok(())
        })
    }
}
