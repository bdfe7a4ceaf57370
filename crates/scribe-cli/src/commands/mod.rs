mod attach;
mod auth_cmd;
pub mod common;
mod completions;
mod delete;
mod detach;
mod edit;
mod list;
mod new;
mod show;

use std::io::{self, Write};

pub use attach::run_attach;
pub use auth_cmd::run_auth;
pub use completions::{completion_script, run_completions};
pub use delete::run_delete;
pub use detach::run_detach;
pub use edit::run_edit;
pub use list::run_list;
pub use new::run_new;
pub use show::run_show;

use scribe_core::session::ConfirmationGate;
use scribe_core::storage::ObjectStore;
use scribe_core::store::NoteStore;

use crate::cli::{Cli, Commands};
use crate::commands::common::{connect, Backend, PromptConfirmation};
use crate::error::CliError;

/// Run a parsed command line against the configured backend.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Auth { command } => run_auth(command).await,
        command => {
            let backend = connect().await?;
            let mut out = io::stdout();
            run_note_command(command, &backend, &PromptConfirmation, &mut out).await
        }
    }
}

/// Note commands, with the confirmation gate used by `delete` unless `--yes` is given.
pub async fn run_note_command<S: NoteStore, O: ObjectStore>(
    command: Commands,
    backend: &Backend<S, O>,
    gate: &impl ConfirmationGate,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        Commands::List { json } => run_list(backend, json, out).await,
        Commands::Show { id, json } => run_show(backend, &id, json, out).await,
        Commands::New(args) => run_new(backend, args, out).await,
        Commands::Edit(args) => run_edit(backend, args, out).await,
        Commands::Attach { id, paths } => run_attach(backend, &id, &paths, out).await,
        Commands::Detach { id, attachment } => run_detach(backend, &id, &attachment, out).await,
        Commands::Delete { id, yes: true } => run_delete(backend, &id, &|_: &str| true, out).await,
        Commands::Delete { id, yes: false } => run_delete(backend, &id, gate, out).await,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Auth { command } => run_auth(command).await,
    }
}
