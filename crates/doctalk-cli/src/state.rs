use std::sync::Arc;

use tokio::sync::Mutex;

use doctalk_client::{Backend, HttpBackend};
use doctalk_session::{ConversationSession, DocumentRegistry, SessionDirectory, UploadCoordinator};

use crate::config::DoctalkConfig;

/// Everything the REPL drives. One instance per process; the components
/// share a single backend handle.
pub struct AppState {
    pub config: DoctalkConfig,
    pub uploads: UploadCoordinator,
    pub registry: DocumentRegistry,
    pub directory: SessionDirectory,
    pub session: ConversationSession,
    /// Set by `delete`; the next line answers the confirmation.
    pub confirm_delete: Mutex<bool>,
}

impl AppState {
    pub fn new(config: DoctalkConfig) -> Self {
        let mut http = HttpBackend::new(&config.api_url);
        if let Some(token) = &config.auth_token {
            http = http.with_auth_token(token.clone());
        }
        Self::with_backend(config, Arc::new(http))
    }

    pub fn with_backend(config: DoctalkConfig, backend: Arc<dyn Backend>) -> Self {
        let session = ConversationSession::new(
            backend.clone(),
            config.default_model_id.clone(),
            config.default_language.clone(),
        );
        Self {
            uploads: UploadCoordinator::new(backend.clone()),
            registry: DocumentRegistry::new(backend.clone()),
            directory: SessionDirectory::new(backend),
            session,
            config,
            confirm_delete: Mutex::new(false),
        }
    }
}
