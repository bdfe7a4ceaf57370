use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "Notes with categories, tags and file attachments")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List your notes, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one note with its attachments
    Show {
        /// Note ID
        id: String,
        /// Output as JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },
    /// Create a note
    New(NewArgs),
    /// Edit a note's fields, tags and attachments
    Edit(EditArgs),
    /// Upload files and attach them to a note
    Attach {
        /// Note ID
        id: String,
        /// Files to upload (PDF, PPT, PPTX, DOC, DOCX or video, 25 MiB max)
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
    /// Remove an attachment from a note and from storage
    Detach {
        /// Note ID
        id: String,
        /// Attachment URL or file name as shown by `scribe show`
        attachment: String,
    },
    /// Delete a note and all of its attachments
    Delete {
        /// Note ID
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Sign in to Supabase and manage the stored session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Args, Debug, Default)]
pub struct NewArgs {
    /// Note title
    #[arg(long)]
    pub title: String,
    /// Note category
    #[arg(long)]
    pub category: String,
    /// Tag to add; repeat or separate with commas
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    /// Markdown body
    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,
    /// Read the Markdown body from a file (`-` for stdin)
    #[arg(long, value_name = "PATH")]
    pub content_file: Option<PathBuf>,
    /// File to upload and attach; repeatable
    #[arg(long = "attach", value_name = "PATH")]
    pub attach: Vec<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct EditArgs {
    /// Note ID
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New category
    #[arg(long)]
    pub category: Option<String>,
    /// New Markdown body
    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,
    /// Read the new Markdown body from a file (`-` for stdin)
    #[arg(long, value_name = "PATH")]
    pub content_file: Option<PathBuf>,
    /// Replace all tags with this comma-separated list
    #[arg(long, value_name = "TAGS", conflicts_with_all = ["tag", "untag"])]
    pub tags: Option<String>,
    /// Tag to add; repeatable
    #[arg(long, value_name = "TAG")]
    pub tag: Vec<String>,
    /// Tag to remove; repeatable
    #[arg(long, value_name = "TAG")]
    pub untag: Vec<String>,
    /// File to upload and attach; repeatable
    #[arg(long = "attach", value_name = "PATH")]
    pub attach: Vec<PathBuf>,
    /// Attachment URL or file name to remove; repeatable
    #[arg(long = "detach", value_name = "ATTACHMENT")]
    pub detach: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with Supabase email/password and store the session in the keychain
    Login {
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show who is signed in
    Status,
    /// Sign out and clear the stored session
    Logout,
}
