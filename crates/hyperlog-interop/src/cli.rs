use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "hyperlog-interop", about = "Restart harness for the Hyperlog log store")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Human-readable log output instead of JSONL
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the log, close it and reopen it empty
    Step1 {
        /// Root directory holding the log namespace
        dir: PathBuf,
    },
    /// Append "Hello" and "World"
    Step2 {
        /// Root directory holding the log namespace
        dir: PathBuf,
    },
    /// Read back step 2, then append three more entries
    Step3 {
        /// Root directory holding the log namespace
        dir: PathBuf,
    },
    /// Run all three steps in this process
    Run {
        /// Root directory holding the log namespace
        dir: PathBuf,
    },
}
