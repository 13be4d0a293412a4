use crate::commands::{self, CommandResult};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Upload rendered short videos to YouTube
#[derive(Debug, Parser)]
#[command(name = "tubeyeet", version)]
pub struct Cli {
    /// Output machine-readable JSON to stdout (success and error)
    #[arg(long, global = true)]
    pub machine: bool,

    /// Verbose logging to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize with Google and save a refresh token
    Login,
    /// Remove the saved refresh token
    Logout,
    /// Upload a video (explicit path, render command output, or newest video in the output directory)
    Upload(UploadArgs),
    /// Show the processing status and metadata of an uploaded video
    Status {
        /// YouTube video ID
        video_id: String,
        /// Poll until YouTube finishes processing the video
        #[arg(long)]
        wait: bool,
    },
    /// Update title, description, tags or privacy of an uploaded video
    Update {
        /// YouTube video ID
        video_id: String,
        #[command(flatten)]
        metadata: MetadataArgs,
    },
    /// Delete an uploaded video
    Delete {
        /// YouTube video ID
        video_id: String,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// 動画メタデータの指定（upload / update 共通）
#[derive(Debug, Clone, Default, Args)]
pub struct MetadataArgs {
    /// Video title (upload defaults to the file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Video description
    #[arg(long)]
    pub description: Option<String>,

    /// Comma-separated tags, e.g. "shorts,news"
    #[arg(long)]
    pub tags: Option<String>,

    /// private, public or unlisted (upload defaults to the configured value, private)
    #[arg(long)]
    pub privacy: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct UploadArgs {
    /// Video file to upload
    pub video: Option<PathBuf>,

    #[command(flatten)]
    pub metadata: MetadataArgs,

    /// Stop after selecting and validating the video
    #[arg(long)]
    pub no_upload: bool,

    /// Directory containing rendered videos (overrides OUTPUT_DIR and config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Show upload progress
    #[arg(long)]
    pub progress: bool,

    /// Custom thumbnail image (JPEG or PNG, up to 2 MB) set after the upload
    #[arg(long, value_name = "PATH")]
    pub thumbnail: Option<PathBuf>,
}

/// サブコマンドを実行する
pub async fn run(command: Command, machine: bool) -> Result<CommandResult> {
    match command {
        Command::Login => commands::login::execute()
            .await
            .context("Login command failed"),
        Command::Logout => commands::logout::execute()
            .await
            .context("Logout command failed"),
        Command::Upload(args) => commands::upload::execute(args, machine)
            .await
            .context("Upload command failed"),
        Command::Status { video_id, wait } => commands::status::execute(&video_id, wait)
            .await
            .context("Status command failed"),
        Command::Update { video_id, metadata } => commands::update::execute(&video_id, metadata)
            .await
            .context("Update command failed"),
        Command::Delete { video_id, force } => commands::delete::execute(&video_id, force, machine)
            .await
            .context("Delete command failed"),
    }
}
