use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] scribe_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Not signed in. Run `scribe auth login --email <EMAIL> --password <PASSWORD>` first.")]
    NotSignedIn,
    #[error(
        "Supabase is not configured. Set SCRIBE_SUPABASE_URL and SCRIBE_SUPABASE_ANON_KEY (or add them to .env)."
    )]
    NotConfigured,
    #[error("Nothing to change. Pass at least one field, tag or attachment flag.")]
    NothingToEdit,
    #[error("No attachment on note {note} matches '{attachment}'")]
    UnknownAttachment { note: String, attachment: String },
}
