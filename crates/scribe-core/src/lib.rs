//! scribe-core - Core library for Scribe
//!
//! This crate contains the note models, the remote note store and object
//! storage clients, the attachment manager and the note editing session
//! shared by every Scribe interface.

pub mod attachments;
pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod session;
pub mod storage;
pub mod store;
pub mod util;

pub use error::{Error, ErrorKind, Result};
pub use models::{Note, NoteDraft, NoteId, NoteRef};
