use std::path::PathBuf;

use clap::Parser;

/// Stockroom image shopping assistant
#[derive(Debug, Parser)]
#[command(name = "stockroom", about = "Chat with an assistant to find and buy stock images")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "stockroom.toml", env = "STOCKROOM_CONFIG")]
    pub config: PathBuf,

    /// Override the chat model
    #[arg(long, env = "STOCKROOM_MODEL")]
    pub model: Option<String>,

    /// Send a single prompt, print the reply, and exit
    #[arg(long, value_name = "PROMPT")]
    pub once: Option<String>,

    /// Wait for whole replies instead of streaming them
    #[arg(long)]
    pub no_stream: bool,
}
