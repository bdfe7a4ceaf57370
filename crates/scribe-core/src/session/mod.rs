//! Editing session for a single note.
//!
//! The session owns the in-memory draft, merges attachment results into it
//! and decides when the record and its attachments are persisted or
//! destroyed. Every remote call carries the caller's [`AuthSession`].

mod state;

use futures::future::join_all;

pub use state::SessionState;

use crate::attachments::{
    AttachmentManager, CandidateFile, RemoveOutcome, UploadProgress, UploadReport,
};
use crate::auth::AuthSession;
use crate::models::{parse_tags, Attachment, NoteDraft, NoteId, NoteRef};
use crate::storage::ObjectStore;
use crate::store::NoteStore;
use crate::{Error, Result};

/// Yes/no decision gate consulted before destructive actions.
pub trait ConfirmationGate {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> ConfirmationGate for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Result of a delete request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The confirmation gate declined; nothing was touched.
    Cancelled,
}

/// Draft state and lifecycle of one open note.
pub struct NoteEditingSession<'a, S, O> {
    store: &'a S,
    attachments: &'a AttachmentManager<O>,
    auth: &'a AuthSession,
    state: SessionState,
    note_id: Option<NoteId>,
    draft: NoteDraft,
    progress: UploadProgress,
}

impl<'a, S: NoteStore, O: ObjectStore> NoteEditingSession<'a, S, O> {
    /// Session for a note that does not exist yet; starts `Ready` with an empty draft.
    pub fn new(store: &'a S, attachments: &'a AttachmentManager<O>, auth: &'a AuthSession) -> Self {
        Self {
            store,
            attachments,
            auth,
            state: SessionState::Ready,
            note_id: None,
            draft: NoteDraft::default(),
            progress: UploadProgress::new(),
        }
    }

    /// Session for an existing note; starts `Loading` until [`Self::load`] runs.
    pub fn loading(
        store: &'a S,
        attachments: &'a AttachmentManager<O>,
        auth: &'a AuthSession,
        id: NoteId,
    ) -> Self {
        Self {
            state: SessionState::Loading,
            note_id: Some(id),
            ..Self::new(store, attachments, auth)
        }
    }

    /// Open a session for `note`, loading it first unless it is new.
    pub async fn open(
        store: &'a S,
        attachments: &'a AttachmentManager<O>,
        auth: &'a AuthSession,
        note: NoteRef,
    ) -> Result<Self> {
        match note {
            NoteRef::New => Ok(Self::new(store, attachments, auth)),
            NoteRef::Existing(id) => {
                let mut session = Self::loading(store, attachments, auth, id);
                session.load().await?;
                Ok(session)
            }
        }
    }

    /// Fetch the note and populate the draft. Only valid while `Loading`;
    /// a failed load leaves the session `Loading` so it can be retried.
    pub async fn load(&mut self) -> Result<()> {
        self.ensure("load", self.state == SessionState::Loading)?;
        let Some(id) = self.note_id.as_ref() else {
            return Err(self.invalid("load"));
        };

        let note = self.store.load(self.auth, id).await?;
        self.draft = NoteDraft::from_note(&note);
        self.transition(SessionState::Ready);
        Ok(())
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn note_id(&self) -> Option<&NoteId> {
        self.note_id.as_ref()
    }

    /// Whether the note has never been saved.
    pub const fn is_new(&self) -> bool {
        self.note_id.is_none()
    }

    pub const fn draft(&self) -> &NoteDraft {
        &self.draft
    }

    /// Attachments of the draft with display names resolved.
    pub fn attachment_list(&self) -> Vec<Attachment> {
        self.draft
            .attachments
            .iter()
            .filter_map(|url| Attachment::from_url(url).ok())
            .collect()
    }

    /// Progress map of the upload batch in flight, if any.
    pub const fn progress(&self) -> &UploadProgress {
        &self.progress
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.ensure_editable("edit")?;
        self.draft.title = title.into();
        Ok(())
    }

    pub fn set_content(&mut self, content: impl Into<String>) -> Result<()> {
        self.ensure_editable("edit")?;
        self.draft.content = content.into();
        Ok(())
    }

    pub fn set_category(&mut self, category: impl Into<String>) -> Result<()> {
        self.ensure_editable("edit")?;
        self.draft.category = category.into();
        Ok(())
    }

    /// Append a tag; blanks and case-insensitive duplicates are ignored.
    pub fn add_tag(&mut self, tag: &str) -> Result<bool> {
        self.ensure_editable("edit")?;
        Ok(self.draft.add_tag(tag))
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<bool> {
        self.ensure_editable("edit")?;
        Ok(self.draft.remove_tag(tag))
    }

    /// Replace all tags from comma-separated input.
    pub fn set_tags(&mut self, input: &str) -> Result<()> {
        self.ensure_editable("edit")?;
        self.draft.tags = parse_tags(input);
        Ok(())
    }

    /// Append uploaded URLs to the draft right away, skipping ones already present.
    ///
    /// Returns how many were added.
    pub fn add_attachments<I>(&mut self, urls: I) -> Result<usize>
    where
        I: IntoIterator<Item = String>,
    {
        self.ensure_editable("attach files")?;
        let mut added = 0;
        for url in urls {
            if !self.draft.attachments.contains(&url) {
                self.draft.attachments.push(url);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Validate and upload a batch, appending every successful URL to the draft.
    ///
    /// Rejections and failed uploads are listed in the returned report; they
    /// never prevent the other files from being attached.
    pub async fn upload_files(&mut self, batch: Vec<CandidateFile>) -> Result<UploadReport> {
        self.ensure_editable("attach files")?;
        let report = self
            .attachments
            .upload_batch(self.auth, batch, &self.progress)
            .await;
        self.add_attachments(report.urls())?;
        Ok(report)
    }

    /// Delete an attachment's object, then drop its URL from the draft.
    ///
    /// The draft is left unchanged when removal fails.
    pub async fn remove_attachment(&mut self, url: &str) -> Result<RemoveOutcome> {
        self.ensure_editable("remove attachments")?;
        if !self.draft.attachments.iter().any(|existing| existing == url) {
            return Err(Error::NotFound(format!("attachment {url} on this note")));
        }

        let outcome = self.attachments.remove(self.auth, url).await?;
        self.draft.attachments.retain(|existing| existing != url);
        Ok(outcome)
    }

    /// Persist the draft: create on first save, update afterwards.
    ///
    /// Blank title or category fail before any remote call and leave the
    /// state untouched. A failed store call moves to `SaveFailed` with the
    /// draft preserved for a manual retry.
    pub async fn save(&mut self) -> Result<NoteId> {
        self.ensure_editable("save")?;
        self.draft.validate()?;

        self.transition(SessionState::Saving);
        let draft = self.draft.normalized();
        let saved = match self.note_id.clone() {
            None => self.store.create(self.auth, &draft).await.map(|note| note.id),
            Some(id) => {
                let updated = self.store.update(self.auth, &id, &draft).await;
                updated.map(|()| id)
            }
        };

        match saved {
            Ok(id) => {
                self.draft = draft;
                self.note_id = Some(id.clone());
                self.transition(SessionState::Saved);
                Ok(id)
            }
            Err(error) => {
                tracing::warn!(note_id = ?self.note_id, error = %error, "Saving note failed");
                self.transition(SessionState::SaveFailed);
                Err(error)
            }
        }
    }

    /// Delete every attachment, then the note record.
    ///
    /// Requires confirmation through `gate`. If any attachment removal
    /// fails the record is kept and the session moves to `DeleteFailed`;
    /// attachments that were removed are dropped from the draft so a retry
    /// only touches what is left.
    pub async fn delete(&mut self, gate: &impl ConfirmationGate) -> Result<DeleteOutcome> {
        self.ensure_editable("delete")?;
        let Some(id) = self.note_id.clone() else {
            return Err(Error::InvalidTransition {
                action: "delete",
                state: "unsaved",
            });
        };

        let prompt = format!(
            "Delete \"{}\" and its {} attachment(s)?",
            self.draft.title,
            self.draft.attachments.len()
        );
        if !gate.confirm(&prompt) {
            tracing::info!(note_id = %id, "Delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        self.transition(SessionState::Deleting);
        if let Err(error) = self.remove_all_attachments().await {
            self.transition(SessionState::DeleteFailed);
            return Err(error);
        }

        match self.store.delete(self.auth, &id).await {
            Ok(()) => {
                self.transition(SessionState::Deleted);
                Ok(DeleteOutcome::Deleted)
            }
            Err(error) => {
                tracing::warn!(note_id = %id, error = %error, "Deleting note record failed");
                self.transition(SessionState::DeleteFailed);
                Err(error)
            }
        }
    }

    async fn remove_all_attachments(&mut self) -> Result<()> {
        let urls = self.draft.attachments.clone();
        if urls.is_empty() {
            return Ok(());
        }

        let manager = self.attachments;
        let auth = self.auth;
        let results = join_all(urls.iter().map(|url| manager.remove(auth, url))).await;

        let mut removed = Vec::new();
        let mut failed = Vec::new();
        for (url, result) in urls.into_iter().zip(results) {
            match result {
                Ok(_) => removed.push(url),
                Err(error) => {
                    tracing::warn!(url = %url, error = %error, "Attachment removal failed");
                    failed.push((url, error));
                }
            }
        }

        self.draft
            .attachments
            .retain(|existing| !removed.contains(existing));

        if failed.is_empty() {
            return Ok(());
        }
        if removed.is_empty() && failed.len() == 1 {
            if let Some((_, error)) = failed.pop() {
                return Err(error);
            }
        }
        Err(Error::PartialBatchFailure {
            failed: failed
                .into_iter()
                .map(|(url, _)| {
                    Attachment::from_url(&url).map_or(url, |attachment| attachment.display_name)
                })
                .collect(),
            succeeded: removed.len(),
        })
    }

    fn ensure_editable(&self, action: &'static str) -> Result<()> {
        self.ensure(action, self.state.is_editable())
    }

    fn ensure(&self, action: &'static str, allowed: bool) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    const fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.state.as_str(),
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::info!(
            note_id = ?self.note_id.as_ref().map(NoteId::as_str),
            from = self.state.as_str(),
            to = next.as_str(),
            "Note session transition"
        );
        self.state = next;
    }
}
