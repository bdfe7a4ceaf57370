use std::io::Write;

use chrono::Utc;
use scribe_core::storage::ObjectStore;
use scribe_core::store::NoteStore;

use crate::commands::common::{
    format_note_lines, note_to_list_item, write_line, Backend, NoteListItem,
};
use crate::error::CliError;

pub async fn run_list<S: NoteStore, O: ObjectStore>(
    backend: &Backend<S, O>,
    as_json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let notes = backend.store.list(&backend.auth).await?;

    if as_json {
        let json_items = notes
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        write_line(out, serde_json::to_string_pretty(&json_items)?)?;
    } else if notes.is_empty() {
        write_line(out, "No notes yet. Create one with `scribe new`.")?;
    } else {
        for line in format_note_lines(&notes, Utc::now()) {
            write_line(out, line)?;
        }
    }

    Ok(())
}
