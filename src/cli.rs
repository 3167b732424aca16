use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "brakewatch")]
#[command(author, version, about = "Watch-folder transcoding daemon with live progress")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch a directory, transcode what arrives and serve status updates
    Start {
        /// Directory watched for new media files
        watch_dir: PathBuf,

        /// Directory receiving finished transcodes
        output_dir: PathBuf,

        /// Media library offered for queueing
        source_dir: PathBuf,

        /// Delete each source file once its job has finished
        #[arg(long, action = clap::ArgAction::Set)]
        delete: Option<bool>,

        /// Directory containing the static web UI
        #[arg(long = "static")]
        static_dir: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check that the transcoder is available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
