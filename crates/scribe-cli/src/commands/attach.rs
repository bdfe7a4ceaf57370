use std::io::Write;
use std::path::PathBuf;

use scribe_core::storage::ObjectStore;
use scribe_core::store::NoteStore;

use crate::commands::common::{
    finish_batch, print_upload_problems, read_candidates, write_line, Backend,
};
use crate::error::CliError;

/// Upload files to an existing note and print the URLs that were attached.
pub async fn run_attach<S: NoteStore, O: ObjectStore>(
    backend: &Backend<S, O>,
    id: &str,
    paths: &[PathBuf],
    out: &mut impl Write,
) -> Result<(), CliError> {
    let batch = read_candidates(paths).await?;
    let mut session = backend.edit(id).await?;

    let report = session.upload_files(batch).await?;
    print_upload_problems(&report);

    if !report.urls().is_empty() {
        session.save().await?;
    }
    for url in report.urls() {
        write_line(out, url)?;
    }

    finish_batch(report)
}
