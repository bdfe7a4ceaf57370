use std::io::Write;

use scribe_core::storage::ObjectStore;
use scribe_core::store::NoteStore;

use crate::cli::EditArgs;
use crate::commands::common::{
    collect_tags, finish_batch, print_upload_problems, read_candidates, resolve_attachment,
    resolve_content, write_line, Backend,
};
use crate::error::CliError;

fn has_changes(args: &EditArgs) -> bool {
    args.title.is_some()
        || args.category.is_some()
        || args.content.is_some()
        || args.content_file.is_some()
        || args.tags.is_some()
        || !args.tag.is_empty()
        || !args.untag.is_empty()
        || !args.attach.is_empty()
        || !args.detach.is_empty()
}

/// Apply field, tag and attachment changes to a note and save it.
///
/// Detached attachments are deleted from storage right away, so the note is
/// saved even when a later step fails; the first failure is reported after.
pub async fn run_edit<S: NoteStore, O: ObjectStore>(
    backend: &Backend<S, O>,
    args: EditArgs,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if !has_changes(&args) {
        return Err(CliError::NothingToEdit);
    }

    let content = resolve_content(args.content, args.content_file.as_deref())?;
    let batch = read_candidates(&args.attach).await?;

    let mut session = backend.edit(&args.id).await?;
    if let Some(title) = args.title {
        session.set_title(title)?;
    }
    if let Some(category) = args.category {
        session.set_category(category)?;
    }
    if let Some(content) = content {
        session.set_content(content)?;
    }
    if let Some(tags) = args.tags {
        session.set_tags(&tags)?;
    }
    for tag in collect_tags(&args.tag) {
        session.add_tag(&tag)?;
    }
    for tag in collect_tags(&args.untag) {
        session.remove_tag(&tag)?;
    }
    session.draft().validate()?;

    let mut pending_error = None;
    for needle in &args.detach {
        let target = resolve_attachment(&args.id, &session.draft().attachments, needle);
        let removal = match target {
            Ok(url) => session.remove_attachment(&url).await.map_err(CliError::from),
            Err(error) => Err(error),
        };
        if let Err(error) = removal {
            pending_error = Some(error);
            break;
        }
    }

    let report = if batch.is_empty() || pending_error.is_some() {
        None
    } else {
        let report = session.upload_files(batch).await?;
        print_upload_problems(&report);
        Some(report)
    };

    let id = session.save().await?;
    write_line(out, id.as_str())?;

    if let Some(error) = pending_error {
        return Err(error);
    }
    report.map_or(Ok(()), finish_batch)
}
