//! HTTP implementation of the backend contract.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use doctalk_core::ids::{ConversationId, DocumentId};
use doctalk_core::models::conversation::Conversation;
use doctalk_core::models::document::Document;
use doctalk_core::routes;

use crate::backend::{Backend, BoxFuture, PromptRequest};
use crate::error::{ClientError, Result};
use crate::wire::{
    ConversationWire, CreateConversationResponse, DeleteFullBody, DeleteHistoryBody, DocumentWire,
    ErrorBody, PresignedUrlResponse, SubmitBody,
};

/// HTTP client for the inference backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    auth_token: Option<String>,
    http: Client,
}

impl HttpBackend {
    /// Create a backend client rooted at `base_url`.
    ///
    /// Example: `HttpBackend::new("https://api.example.com/prod")`
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
            http: Client::new(),
        }
    }

    /// Attach a bearer token to every JSON call. Never sent to presigned URLs.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "backend request");
        let req = self.http.request(method, url);
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

async fn json_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        Err(parse_error(response).await)
    }
}

async fn empty_response(response: Response) -> Result<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(parse_error(response).await)
    }
}

async fn parse_error(response: Response) -> ClientError {
    let status = response.status();
    let url = response.url().path().to_string();
    let text = response.text().await.unwrap_or_default();

    if status == StatusCode::NOT_FOUND {
        return ClientError::NotFound(url);
    }

    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or(text);

    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

impl Backend for HttpBackend {
    fn presigned_url(&self, file_name: &str) -> BoxFuture<'_, Result<String>> {
        let file_name = file_name.to_string();
        Box::pin(async move {
            let response = self
                .request(Method::GET, routes::PRESIGNED_URL)
                .query(&[("file_name", file_name.as_str())])
                .send()
                .await?;
            let body: PresignedUrlResponse = json_response(response).await?;
            Ok(body.presignedurl)
        })
    }

    fn put_object(
        &self,
        url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'_, Result<()>> {
        let url = url.to_string();
        let content_type = content_type.to_string();
        Box::pin(async move {
            let size = bytes.len();
            let response = self
                .http
                .put(&url)
                .header(CONTENT_TYPE, content_type)
                .body(bytes)
                .send()
                .await
                .map_err(|e| ClientError::Transfer(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(ClientError::Transfer(format!("{status}: {text}")));
            }

            info!(size, "upload transfer complete");
            Ok(())
        })
    }

    fn list_documents(&self) -> BoxFuture<'_, Result<Vec<Document>>> {
        Box::pin(async move {
            let response = self.request(Method::GET, routes::DOCUMENTS).send().await?;
            let body: Vec<DocumentWire> = json_response(response).await?;
            Ok(body.into_iter().map(Document::from).collect())
        })
    }

    fn get_conversation(
        &self,
        document_id: &DocumentId,
        conversation_id: &ConversationId,
    ) -> BoxFuture<'_, Result<Conversation>> {
        let path = routes::conversation(document_id, conversation_id);
        Box::pin(async move {
            let response = self.request(Method::GET, &path).send().await?;
            let body: ConversationWire = json_response(response).await?;
            Ok(body.into())
        })
    }

    fn create_conversation(
        &self,
        document_id: &DocumentId,
    ) -> BoxFuture<'_, Result<ConversationId>> {
        let path = routes::document(document_id);
        Box::pin(async move {
            let response = self.request(Method::POST, &path).send().await?;
            let body: CreateConversationResponse = json_response(response).await?;
            Ok(ConversationId::new(body.conversationid))
        })
    }

    fn submit_prompt(&self, request: &PromptRequest) -> BoxFuture<'_, Result<()>> {
        let request = request.clone();
        Box::pin(async move {
            let path = routes::submit(&request.document_id, &request.conversation_id);
            let body = SubmitBody {
                file_name: &request.file_name,
                prompt: &request.prompt,
                language: &request.language,
                model_id: &request.model_id,
            };
            let response = self.request(Method::POST, &path).json(&body).send().await?;
            empty_response(response).await
        })
    }

    fn delete_history(&self, conversation_ids: &[ConversationId]) -> BoxFuture<'_, Result<()>> {
        let conversation_ids = conversation_ids.to_vec();
        Box::pin(async move {
            let body = DeleteHistoryBody {
                conversation_ids: &conversation_ids,
            };
            let response = self
                .request(Method::DELETE, routes::DELETE_HISTORY)
                .json(&body)
                .send()
                .await?;
            empty_response(response).await
        })
    }

    fn delete_full(
        &self,
        conversation_ids: &[ConversationId],
        document_id: &DocumentId,
    ) -> BoxFuture<'_, Result<()>> {
        let conversation_ids = conversation_ids.to_vec();
        let document_id = document_id.clone();
        Box::pin(async move {
            let body = DeleteFullBody {
                conversation_ids: &conversation_ids,
                document_id: &document_id,
            };
            let response = self
                .request(Method::DELETE, routes::DELETE_FULL)
                .json(&body)
                .send()
                .await?;
            empty_response(response).await
        })
    }
}
