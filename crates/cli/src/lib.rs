//! Operator console for a WebSocket session-aggregation service.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;

mod console;
mod history_cli;

#[derive(Parser)]
#[command(name = "aggprobe")]
#[command(about = "Manually exercise a session aggregator: OTP login, WebSocket sends, history replay")]
pub struct AggprobeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Interactive console (connect roles, send messages, replay history)
    Console(console::ConsoleArgs),
    /// Inspect persisted message history without connecting
    History(history_cli::HistoryArgs),
}

pub async fn run() -> anyhow::Result<()> {
    let cli = AggprobeCli::parse();
    match cli.command {
        Commands::Console(args) => console::run(args).await,
        Commands::History(args) => history_cli::run(args),
    }
}
