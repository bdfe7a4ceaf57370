use std::io::Write;

use scribe_core::storage::ObjectStore;
use scribe_core::store::NoteStore;

use crate::cli::NewArgs;
use crate::commands::common::{
    collect_tags, finish_batch, print_upload_problems, read_candidates, resolve_content,
    write_line, Backend,
};
use crate::error::CliError;

/// Create a note, uploading `--attach` files before the first save.
pub async fn run_new<S: NoteStore, O: ObjectStore>(
    backend: &Backend<S, O>,
    args: NewArgs,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let content = resolve_content(args.content, args.content_file.as_deref())?;
    let batch = read_candidates(&args.attach).await?;

    let mut session = backend.create();
    session.set_title(args.title)?;
    session.set_category(args.category)?;
    for tag in collect_tags(&args.tags) {
        session.add_tag(&tag)?;
    }
    if let Some(content) = content {
        session.set_content(content)?;
    }
    session.draft().validate()?;

    let report = if batch.is_empty() {
        None
    } else {
        let report = session.upload_files(batch).await?;
        print_upload_problems(&report);
        Some(report)
    };

    let id = session.save().await?;
    write_line(out, id.as_str())?;

    report.map_or(Ok(()), finish_batch)
}
