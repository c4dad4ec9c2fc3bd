use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agentloop", version, about = "Two-agent implement/review loop driver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory the loop operates on (defaults to CWD)
    #[arg(long, global = true)]
    pub workspace: Option<String>,

    /// Path to a TOML config file (defaults to <workspace>/agentloop.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a fresh loop, discarding any saved state
    Start {
        /// Path to a file containing the specification text to implement
        spec_file: String,

        /// Base URL for the HTTP backend (requires the `http` feature)
        #[arg(long)]
        backend_url: Option<String>,

        /// Model name passed to the backend
        #[arg(long)]
        model: Option<String>,
    },

    /// Resume a loop from its last saved state
    Resume {
        /// Base URL for the HTTP backend (requires the `http` feature)
        #[arg(long)]
        backend_url: Option<String>,

        /// Model name passed to the backend
        #[arg(long)]
        model: Option<String>,
    },

    /// Print the current cycle count, phase, score, and token usage
    Status,

    /// Mark a saved loop as paused; the next `resume` will stop after the current cycle
    Pause,
}
