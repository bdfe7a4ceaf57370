//! Note record persistence.

mod memory;
mod supabase;

use std::future::Future;

pub use memory::MemoryNoteStore;
pub use supabase::SupabaseNoteStore;

use crate::auth::AuthSession;
use crate::models::{Note, NoteDraft, NoteId};
use crate::Result;

/// Create/read/update/delete of note records on the persistence service.
///
/// Implementations shape requests only. They never touch attachment storage.
pub trait NoteStore: Send + Sync {
    /// Fetch one note. `NotFound` when no row matches or the caller cannot see it.
    fn load(&self, auth: &AuthSession, id: &NoteId) -> impl Future<Output = Result<Note>> + Send;

    /// The caller's notes, newest first.
    fn list(&self, auth: &AuthSession) -> impl Future<Output = Result<Vec<Note>>> + Send;

    /// Insert a note owned by the caller.
    ///
    /// Fails with `Validation` when title or category are blank after trimming.
    fn create(
        &self,
        auth: &AuthSession,
        draft: &NoteDraft,
    ) -> impl Future<Output = Result<Note>> + Send;

    /// Replace the mutable fields of an existing note.
    fn update(
        &self,
        auth: &AuthSession,
        id: &NoteId,
        draft: &NoteDraft,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove a note record.
    ///
    /// Deleting a row that is already gone succeeds: a retry after a lost
    /// acknowledgment must not fail.
    fn delete(&self, auth: &AuthSession, id: &NoteId) -> impl Future<Output = Result<()>> + Send;
}
