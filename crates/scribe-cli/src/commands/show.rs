use std::io::Write;

use scribe_core::export::{render_note, ExportFormat};
use scribe_core::storage::ObjectStore;
use scribe_core::store::NoteStore;

use crate::commands::common::{normalize_note_identifier, Backend};
use crate::error::CliError;

pub async fn run_show<S: NoteStore, O: ObjectStore>(
    backend: &Backend<S, O>,
    id: &str,
    as_json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let id = normalize_note_identifier(id)?;
    let note = backend.store.load(&backend.auth, &id).await?;

    let format = if as_json {
        ExportFormat::Json
    } else {
        ExportFormat::Markdown
    };
    let rendered = render_note(&note, format)?;
    write!(out, "{rendered}")?;
    if format == ExportFormat::Json {
        writeln!(out)?;
    }
    Ok(())
}
