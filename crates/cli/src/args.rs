//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// devshare: turn learning notes into scheduled social posts
#[derive(Parser, Debug)]
#[command(name = "devshare")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler loop that publishes due posts
    Run(RunArgs),

    /// Manage learning notes
    Note(NoteArgs),

    /// Manage and publish posts
    Post(PostArgs),

    /// Generate platform drafts from a note
    Generate(GenerateArgs),

    /// Link social accounts (OAuth)
    Auth(AuthArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Process one scheduler tick and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct NoteArgs {
    #[command(subcommand)]
    pub command: NoteCommands,
}

#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Create a note
    Add {
        #[arg(long)]
        title: String,

        /// Note body text
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        /// File containing the note body (use - for stdin)
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
    },

    /// List notes with their post counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Soft-delete a note
    Delete { id: Uuid },
}

#[derive(Args, Debug)]
pub struct PostArgs {
    #[command(subcommand)]
    pub command: PostCommands,
}

#[derive(Subcommand, Debug)]
pub enum PostCommands {
    /// Create a post attached to a note
    Create {
        #[arg(long)]
        note: Uuid,

        /// Target platform (linkedin, twitter, bluesky)
        #[arg(long)]
        platform: String,

        #[arg(long)]
        content: String,

        /// Schedule for a future time (RFC 3339)
        #[arg(long)]
        schedule_at: Option<String>,
    },

    /// List posts
    List {
        /// Only posts derived from this note
        #[arg(long)]
        note: Option<Uuid>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Publish a post now
    Publish { id: Uuid },

    /// Schedule a post for a future time
    Schedule {
        id: Uuid,

        /// RFC 3339 timestamp
        #[arg(long)]
        at: String,
    },

    /// Mark a post as published without calling any platform
    MarkPublished { id: Uuid },
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Note to generate drafts from
    #[arg(long)]
    pub note: Uuid,

    /// Target platforms, comma separated (defaults to all)
    #[arg(long, value_delimiter = ',')]
    pub platforms: Vec<String>,

    /// Persist the generated drafts as draft posts
    #[arg(long)]
    pub save: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Link a LinkedIn account from a token in the configured env var
    LinkedinToken {
        /// LinkedIn member id (the person URN suffix)
        #[arg(long)]
        member_id: String,
    },

    /// Start the X OAuth flow: prints the authorization URL to open
    XBegin,

    /// Complete the X OAuth flow with the callback code and state
    XComplete {
        #[arg(long)]
        code: String,

        #[arg(long)]
        state: String,
    },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
