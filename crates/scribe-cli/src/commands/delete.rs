use std::io::Write;

use scribe_core::session::{ConfirmationGate, DeleteOutcome};
use scribe_core::storage::ObjectStore;
use scribe_core::store::NoteStore;

use crate::commands::common::{write_line, Backend};
use crate::error::CliError;

pub async fn run_delete<S: NoteStore, O: ObjectStore>(
    backend: &Backend<S, O>,
    id: &str,
    gate: &impl ConfirmationGate,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut session = backend.edit(id).await?;

    match session.delete(gate).await? {
        DeleteOutcome::Deleted => write_line(out, format!("Deleted {id}")),
        DeleteOutcome::Cancelled => write_line(out, "Cancelled"),
    }
}
