use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use scribe_core::attachments::{AttachmentManager, CandidateFile, UploadReport};
use scribe_core::auth::AuthSession;
use scribe_core::config::ClientConfig;
use scribe_core::models::{parse_tags, Attachment};
use scribe_core::session::{ConfirmationGate, NoteEditingSession};
use scribe_core::storage::{ConfiguredStorage, ObjectStore};
use scribe_core::store::{NoteStore, SupabaseNoteStore};
use scribe_core::{Note, NoteId, NoteRef};
use serde::Serialize;

use crate::auth::auth_client;
use crate::error::CliError;

/// Remote services plus the signed-in user every command runs as.
pub struct Backend<S, O> {
    pub store: S,
    pub attachments: AttachmentManager<O>,
    pub auth: AuthSession,
}

impl<S: NoteStore, O: ObjectStore> Backend<S, O> {
    pub const fn new(store: S, storage: O, auth: AuthSession) -> Self {
        Self {
            store,
            attachments: AttachmentManager::new(storage),
            auth,
        }
    }

    /// Open an editing session on an existing note.
    pub async fn edit(&self, id: &str) -> Result<NoteEditingSession<'_, S, O>, CliError> {
        let id = normalize_note_identifier(id)?;
        Ok(NoteEditingSession::open(
            &self.store,
            &self.attachments,
            &self.auth,
            NoteRef::Existing(id),
        )
        .await?)
    }

    pub fn create(&self) -> NoteEditingSession<'_, S, O> {
        NoteEditingSession::new(&self.store, &self.attachments, &self.auth)
    }
}

/// Connect to the configured Supabase project with the stored session.
pub async fn connect() -> Result<Backend<SupabaseNoteStore, ConfiguredStorage>, CliError> {
    let config = ClientConfig::from_env()?;
    let auth = auth_client(&config.project())?
        .restore_session()
        .await?
        .ok_or(CliError::NotSignedIn)?;

    let storage = ConfiguredStorage::from_config(&config)?;
    tracing::debug!(
        backend = storage.backend_name(),
        table = %config.notes_table,
        "Connected to Supabase"
    );
    Ok(Backend::new(
        SupabaseNoteStore::from_config(&config)?,
        storage,
        auth,
    ))
}

pub fn normalize_note_identifier(raw: &str) -> Result<NoteId, CliError> {
    Ok(raw.parse::<NoteId>()?)
}

/// Body from `--content` or `--content-file` (`-` reads stdin).
pub fn resolve_content(
    content: Option<String>,
    content_file: Option<&Path>,
) -> Result<Option<String>, CliError> {
    if content.is_some() {
        return Ok(content);
    }
    let Some(path) = content_file else {
        return Ok(None);
    };

    if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(Some(buffer))
    } else {
        Ok(Some(std::fs::read_to_string(path)?))
    }
}

/// Tags from repeated `--tag` flags, each of which may hold a comma list.
pub fn collect_tags(values: &[String]) -> Vec<String> {
    parse_tags(&values.join(","))
}

pub async fn read_candidates(paths: &[PathBuf]) -> Result<Vec<CandidateFile>, CliError> {
    let mut batch = Vec::with_capacity(paths.len());
    for path in paths {
        batch.push(CandidateFile::from_path(path).await?);
    }
    Ok(batch)
}

/// Print per-file problems of an upload batch to stderr.
pub fn print_upload_problems(report: &UploadReport) {
    for rejected in &report.rejected {
        eprintln!("Skipped {rejected}");
    }
    for (name, error) in report.failures() {
        eprintln!("Failed to upload {name}: {error}");
    }
}

/// Fail with the names of skipped or failed files once the note is saved.
pub fn finish_batch(report: UploadReport) -> Result<(), CliError> {
    report.into_result()?;
    Ok(())
}

/// Find an attachment by URL, object name or display name.
pub fn resolve_attachment(note_id: &str, urls: &[String], needle: &str) -> Result<String, CliError> {
    let needle = needle.trim();
    urls.iter()
        .find(|url| {
            url.as_str() == needle
                || Attachment::from_url(url).is_ok_and(|attachment| {
                    attachment.object_name == needle || attachment.display_name == needle
                })
        })
        .cloned()
        .ok_or_else(|| CliError::UnknownAttachment {
            note: note_id.to_string(),
            attachment: needle.to_string(),
        })
}

/// Interactive yes/no prompt on stderr/stdin. Anything but `y`/`yes` declines,
/// and so does a stdin that is not a terminal (scripts pass `--yes`).
pub struct PromptConfirmation;

impl ConfirmationGate for PromptConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        if !io::stdin().is_terminal() {
            return false;
        }

        eprint!("{prompt} [y/N] ");
        if io::stderr().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_affirmative(&answer)
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub attachments: usize,
    pub created_at: Option<String>,
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        category: note.category.clone(),
        tags: note.tags.clone(),
        attachments: note.attachments.len(),
        created_at: note.created_at.map(|at| at.to_rfc3339()),
    }
}

pub fn format_note_lines(notes: &[Note], now: DateTime<Utc>) -> Vec<String> {
    notes
        .iter()
        .map(|note| {
            let mut line = format!("{}  {} [{}]", note.id, note.title, note.category);
            for tag in &note.tags {
                line.push_str(" #");
                line.push_str(tag);
            }
            if !note.attachments.is_empty() {
                line.push_str(&format!(" ({} attached)", note.attachments.len()));
            }
            if let Some(created_at) = note.created_at {
                line.push_str(&format!(" - {}", format_relative_time(created_at, now)));
            }
            line
        })
        .collect()
}

pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds().max(0);
    match seconds {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", seconds / 60),
        3_600..=86_399 => format!("{}h ago", seconds / 3_600),
        86_400..=604_799 => format!("{}d ago", seconds / 86_400),
        _ => at.format("%Y-%m-%d").to_string(),
    }
}

pub fn write_line(out: &mut impl Write, line: impl AsRef<str>) -> Result<(), CliError> {
    writeln!(out, "{}", line.as_ref())?;
    Ok(())
}
