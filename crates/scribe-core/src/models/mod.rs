//! Data models for Scribe

mod attachment;
mod note;

pub use attachment::{file_extension, object_name_from_url, Attachment};
pub use note::{parse_tags, Note, NoteDraft, NoteId, NoteRef, NEW_NOTE_SENTINEL};
