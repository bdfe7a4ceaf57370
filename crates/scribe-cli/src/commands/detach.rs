use std::io::Write;

use scribe_core::attachments::RemoveOutcome;
use scribe_core::storage::ObjectStore;
use scribe_core::store::NoteStore;

use crate::commands::common::{resolve_attachment, write_line, Backend};
use crate::error::CliError;

pub async fn run_detach<S: NoteStore, O: ObjectStore>(
    backend: &Backend<S, O>,
    id: &str,
    attachment: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut session = backend.edit(id).await?;
    let url = resolve_attachment(id, &session.draft().attachments, attachment)?;

    let outcome = session.remove_attachment(&url).await?;
    session.save().await?;

    match outcome {
        RemoveOutcome::Removed => write_line(out, format!("Removed {url}")),
        RemoveOutcome::AlreadyAbsent => {
            write_line(out, format!("Dropped {url} (already gone from storage)"))
        }
    }
}
