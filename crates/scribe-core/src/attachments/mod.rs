//! Attachment upload and removal orchestration.
//!
//! Files are validated one by one, uploaded concurrently under a random
//! storage name that keeps the original extension, and reported back per
//! file. Nothing here is buffered locally or rolled back.

mod progress;
mod validation;

use futures::future::join_all;
use uuid::Uuid;

pub use progress::UploadProgress;
pub use validation::{
    format_size, partition, validate, AcceptedFile, CandidateFile, FileCheck, RejectReason,
    RejectedFile, MAX_ATTACHMENT_BYTES,
};

use crate::auth::AuthSession;
use crate::models::object_name_from_url;
use crate::storage::ObjectStore;
use crate::{Error, Result};

/// Attempts per file when the generated storage name is already taken.
const MAX_NAME_ATTEMPTS: usize = 3;

/// Settled result of one upload job.
#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded { name: String, url: String },
    Failed { name: String, error: Error },
}

impl UploadOutcome {
    /// Display name of the uploaded file.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Uploaded { name, .. } | Self::Failed { name, .. } => name,
        }
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Uploaded { url, .. } => Some(url),
            Self::Failed { .. } => None,
        }
    }
}

/// Everything that happened to one batch: rejections plus upload outcomes.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub rejected: Vec<RejectedFile>,
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    /// Public URLs of the successful uploads, in batch order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(UploadOutcome::url)
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Uploads that were attempted and failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            UploadOutcome::Failed { name, error } => Some((name.as_str(), error)),
            UploadOutcome::Uploaded { .. } => None,
        })
    }

    /// Whether every file in the batch was accepted and uploaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty() && self.failures().next().is_none()
    }

    /// Collapse the report into a single error naming every file that did
    /// not make it, or `Ok` with the uploaded URLs.
    ///
    /// A lone file that failed with nothing uploaded returns its own error:
    /// a rejection as [`Error::Validation`], an upload failure unchanged.
    pub fn into_result(mut self) -> Result<Vec<String>> {
        if self.is_complete() {
            return Ok(self.urls());
        }

        let succeeded = self.urls().len();
        if succeeded == 0 && self.rejected.len() + self.outcomes.len() == 1 {
            if let Some(rejected) = self.rejected.pop() {
                return Err(Error::Validation(rejected.to_string()));
            }
            if let Some(UploadOutcome::Failed { error, .. }) = self.outcomes.pop() {
                return Err(error);
            }
        }

        let mut failed = self
            .rejected
            .into_iter()
            .map(|file| file.name)
            .collect::<Vec<_>>();
        failed.extend(self.outcomes.into_iter().filter_map(|outcome| match outcome {
            UploadOutcome::Failed { name, .. } => Some(name),
            UploadOutcome::Uploaded { .. } => None,
        }));

        Err(Error::PartialBatchFailure { failed, succeeded })
    }
}

/// What a removal found in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The object was already gone; the URL can still be dropped.
    AlreadyAbsent,
}

/// Validates, uploads and removes attachment blobs on an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct AttachmentManager<O> {
    storage: O,
}

impl<O: ObjectStore> AttachmentManager<O> {
    pub const fn new(storage: O) -> Self {
        Self { storage }
    }

    pub const fn storage(&self) -> &O {
        &self.storage
    }

    /// Validate a single file.
    #[must_use]
    pub fn validate(&self, file: CandidateFile) -> FileCheck {
        validate(file)
    }

    /// Upload accepted files concurrently; every job settles before this returns.
    pub async fn upload(&self, auth: &AuthSession, files: &[AcceptedFile]) -> Vec<UploadOutcome> {
        self.upload_with_progress(auth, files, &UploadProgress::new())
            .await
    }

    /// Like [`Self::upload`], publishing per-file percentages to `progress`.
    pub async fn upload_with_progress(
        &self,
        auth: &AuthSession,
        files: &[AcceptedFile],
        progress: &UploadProgress,
    ) -> Vec<UploadOutcome> {
        if files.is_empty() {
            return Vec::new();
        }

        tracing::info!(files = files.len(), "Uploading attachment batch");
        for file in files {
            progress.set(file.name(), 0);
        }

        let jobs = files
            .iter()
            .map(|file| self.upload_one(auth, file, progress));
        let outcomes = join_all(jobs).await;
        progress.clear();

        let failed = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, UploadOutcome::Failed { .. }))
            .count();
        tracing::info!(
            uploaded = outcomes.len() - failed,
            failed,
            "Attachment batch settled"
        );
        outcomes
    }

    /// Validate a raw batch and upload whatever passes.
    pub async fn upload_batch(
        &self,
        auth: &AuthSession,
        batch: Vec<CandidateFile>,
        progress: &UploadProgress,
    ) -> UploadReport {
        let (accepted, rejected) = partition(batch);
        for file in &rejected {
            tracing::warn!(file = %file.name, reason = %file.reason, "Rejected attachment");
        }

        let outcomes = self.upload_with_progress(auth, &accepted, progress).await;
        UploadReport { rejected, outcomes }
    }

    /// Delete the object behind an attachment URL.
    ///
    /// An object that is already gone is reported as [`RemoveOutcome::AlreadyAbsent`]
    /// rather than as an error.
    pub async fn remove(&self, auth: &AuthSession, url: &str) -> Result<RemoveOutcome> {
        let name = object_name_from_url(url)?;
        let removed = self
            .storage
            .remove_objects(auth, std::slice::from_ref(&name))
            .await?;

        if removed.iter().any(|removed| *removed == name) {
            tracing::debug!(object = %name, "Removed attachment object");
            Ok(RemoveOutcome::Removed)
        } else {
            tracing::warn!(object = %name, "Attachment object was already absent");
            Ok(RemoveOutcome::AlreadyAbsent)
        }
    }

    async fn upload_one(
        &self,
        auth: &AuthSession,
        file: &AcceptedFile,
        progress: &UploadProgress,
    ) -> UploadOutcome {
        let name = file.name().to_string();
        match self.put_with_fresh_name(auth, file).await {
            Ok(url) => {
                progress.set(&name, 100);
                UploadOutcome::Uploaded { name, url }
            }
            Err(error) => {
                tracing::warn!(file = %name, error = %error, "Attachment upload failed");
                UploadOutcome::Failed { name, error }
            }
        }
    }

    async fn put_with_fresh_name(&self, auth: &AuthSession, file: &AcceptedFile) -> Result<String> {
        let mut attempt = 1;
        loop {
            let object_name = storage_name(file.extension());
            match self
                .storage
                .put_object(auth, &object_name, file.bytes(), file.content_type())
                .await
            {
                Ok(()) => return Ok(self.storage.public_url(&object_name)),
                Err(Error::Conflict(_)) if attempt < MAX_NAME_ATTEMPTS => {
                    tracing::debug!(object = %object_name, attempt, "Storage name taken, regenerating");
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Random storage name keeping the original extension.
fn storage_name(extension: &str) -> String {
    let id = Uuid::new_v4().simple();
    if extension.is_empty() {
        id.to_string()
    } else {
        format!("{id}.{extension}")
    }
}
