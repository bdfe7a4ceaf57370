//! Note model

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Sentinel used in routes and on the command line for a not-yet-saved note.
pub const NEW_NOTE_SENTINEL: &str = "new";

/// Opaque note identifier assigned by the persistence service.
///
/// Rows may carry either textual (uuid) or numeric keys; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteId(String);

impl NoteId {
    /// Wrap a service-assigned identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(Error::Validation("Note id cannot be empty".to_string()));
        }
        if id.eq_ignore_ascii_case(NEW_NOTE_SENTINEL) {
            return Err(Error::Validation(format!(
                "'{NEW_NOTE_SENTINEL}' is reserved and cannot be a note id"
            )));
        }
        Ok(Self(id))
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Serialize for NoteId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        let raw = match RawId::deserialize(deserializer)? {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        };
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Which note an editing session is opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteRef {
    /// Not persisted yet; the first save assigns an id.
    New,
    Existing(NoteId),
}

impl FromStr for NoteRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case(NEW_NOTE_SENTINEL) {
            Ok(Self::New)
        } else {
            Ok(Self::Existing(s.parse()?))
        }
    }
}

impl fmt::Display for NoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str(NEW_NOTE_SENTINEL),
            Self::Existing(id) => id.fmt(f),
        }
    }
}

/// A persisted note record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Identifier assigned on first save
    pub id: NoteId,
    pub title: String,
    /// Markdown body
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    pub category: String,
    /// Tags in insertion order
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// Public attachment URLs in insertion order
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<String>,
    /// Owning user
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The editable fields of a note, held in memory by an editing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub attachments: Vec<String>,
}

impl NoteDraft {
    /// Start a draft from a loaded note.
    #[must_use]
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            category: note.category.clone(),
            tags: note.tags.clone(),
            attachments: note.attachments.clone(),
        }
    }

    /// Copy with title and category trimmed, as sent to the store.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            category: self.category.trim().to_string(),
            ..self.clone()
        }
    }

    /// Check the required fields after trimming.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.category.trim().is_empty() {
            missing.push("category");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "Note {} cannot be empty",
                missing.join(" and ")
            )))
        }
    }

    /// Append a tag unless it is blank or already present (case-insensitive).
    ///
    /// Returns whether the tag was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Remove a tag (case-insensitive). Returns whether anything was removed.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        let tag = tag.trim();
        self.tags.retain(|existing| !existing.eq_ignore_ascii_case(tag));
        self.tags.len() != before
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(tag))
    }
}

/// Split comma-separated tag input.
///
/// Entries are trimmed, blanks dropped, and case-insensitive duplicates
/// collapsed onto the first occurrence. Insertion order is preserved.
///
/// # Examples
///
/// ```
/// use scribe_core::models::parse_tags;
///
/// let tags = parse_tags("exam, Biology ,, exam, cells");
/// assert_eq!(tags, vec!["exam", "Biology", "cells"]);
/// ```
#[must_use]
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.to_lowercase()))
        .map(ToOwned::to_owned)
        .collect()
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
