use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hlsforge")]
#[command(author, version, about = "Upload-to-HLS transcoding server")]
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
    /// Start the upload and HLS server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Transcode a local file into a new namespace, as an upload would
    Transcode {
        /// Media file to transcode
        #[arg(required = true)]
        input: PathBuf,

        /// Storage root to write the namespace into (overrides config)
        #[arg(long)]
        storage: Option<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,

    /// Generate a bcrypt password hash for upload authentication
    HashPassword {
        /// Password to hash
        password: String,
    },
}
