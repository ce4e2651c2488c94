//! Validating and transferring one file at a time to backend storage.
//!
//! An upload is two round-trips: obtain a presigned write URL for the file
//! name, then PUT the bytes to it. At most one upload is in flight per
//! coordinator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use doctalk_client::Backend;
use doctalk_core::content_type;
use doctalk_core::models::upload::{UploadFile, UploadState};

use crate::error::{Failure, SessionError};

/// What the presenter renders for the upload area.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UploadSnapshot {
    pub state: UploadState,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub error: Option<Failure>,
}

#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { file_name: String, size: u64 },
    /// The coordinator was reset while the transfer was in flight; the
    /// result was ignored.
    Discarded,
}

#[derive(Debug, Clone)]
struct UploadTask {
    file_name: String,
    content_type: String,
    size: u64,
    state: UploadState,
    error: Option<Failure>,
}

#[derive(Debug, Default)]
struct Slot {
    task: Option<UploadTask>,
    generation: u64,
}

pub struct UploadCoordinator {
    backend: Arc<dyn Backend>,
    slot: Mutex<Slot>,
}

impl UploadCoordinator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            slot: Mutex::new(Slot::default()),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> UploadState {
        self.slot()
            .task
            .as_ref()
            .map_or(UploadState::Idle, |t| t.state)
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        match &self.slot().task {
            None => UploadSnapshot::default(),
            Some(task) => UploadSnapshot {
                state: task.state,
                file_name: Some(task.file_name.clone()),
                content_type: Some(task.content_type.clone()),
                size: Some(task.size),
                error: task.error.clone(),
            },
        }
    }

    /// Accept a file for upload if its declared type is allowed.
    ///
    /// A rejected file never becomes a task, and whatever the coordinator
    /// held before is left as it was.
    pub fn validate(&self, file: &UploadFile) -> Result<(), SessionError> {
        let mut slot = self.slot();
        check(&slot, file)?;
        slot.task = Some(UploadTask::new(file, UploadState::Validated));
        Ok(())
    }

    /// Upload a file: request a presigned URL, then transfer the bytes.
    ///
    /// Failures are returned to the caller and never retried here; a retry
    /// needs a fresh URL anyway.
    pub async fn upload(&self, file: UploadFile) -> Result<UploadOutcome, SessionError> {
        let generation = {
            let mut slot = self.slot();
            check(&slot, &file)?;
            slot.generation += 1;
            slot.task = Some(UploadTask::new(&file, UploadState::Uploading));
            slot.generation
        };

        let UploadFile {
            name,
            content_type,
            bytes,
        } = file;
        let size = bytes.len() as u64;

        info!(file_name = %name, %content_type, size, "upload started");

        let result = self.transfer(&name, &content_type, bytes).await;

        let mut slot = self.slot();
        if slot.generation != generation {
            warn!(file_name = %name, "upload finished after reset; ignoring result");
            return Ok(UploadOutcome::Discarded);
        }

        match result {
            Ok(()) => {
                if let Some(task) = slot.task.as_mut() {
                    task.state = UploadState::Succeeded;
                }
                info!(file_name = %name, size, "upload succeeded");
                Ok(UploadOutcome::Uploaded {
                    file_name: name,
                    size,
                })
            }
            Err(e) => {
                if let Some(task) = slot.task.as_mut() {
                    task.state = UploadState::Failed;
                    task.error = Some(Failure::from(&e));
                }
                warn!(file_name = %name, error = %e, "upload failed");
                Err(e)
            }
        }
    }

    async fn transfer(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), SessionError> {
        let url = self.backend.presigned_url(file_name).await?;
        self.backend
            .put_object(&url, content_type, bytes)
            .await
            .map_err(|e| match SessionError::from(e) {
                SessionError::NetworkFailure(msg) => SessionError::TransferFailed(msg),
                other => other,
            })
    }

    /// Back to `Idle` from any state. An in-flight transfer is not aborted,
    /// but its result will be ignored.
    pub fn reset(&self) {
        let mut slot = self.slot();
        slot.generation += 1;
        slot.task = None;
    }

    /// Dismiss a succeeded upload. Returns `false` if there was none.
    pub fn acknowledge(&self) -> bool {
        let mut slot = self.slot();
        let succeeded = slot
            .task
            .as_ref()
            .is_some_and(|t| t.state == UploadState::Succeeded);
        if succeeded {
            slot.task = None;
        }
        succeeded
    }
}

fn check(slot: &Slot, file: &UploadFile) -> Result<(), SessionError> {
    if !content_type::is_allowed(&file.content_type) {
        return Err(SessionError::UnsupportedType(file.content_type.clone()));
    }
    if slot
        .task
        .as_ref()
        .is_some_and(|t| t.state == UploadState::Uploading)
    {
        return Err(SessionError::AlreadyInProgress("upload"));
    }
    Ok(())
}

impl UploadTask {
    fn new(file: &UploadFile, state: UploadState) -> Self {
        Self {
            file_name: file.name.clone(),
            content_type: file.content_type.clone(),
            size: file.size(),
            state,
            error: None,
        }
    }
}
