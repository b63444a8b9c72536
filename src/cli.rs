use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "telegram-mcp", about = "Telegram dialogs and messages as MCP tools over stdio")]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the tools on stdin/stdout
    Serve {
        /// Check the session against the upstream and exit instead of serving
        #[arg(long)]
        dry: bool,
    },
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve { dry: false })
    }
}
