//! Offline inspection of persisted message history.

use std::path::PathBuf;

use aggprobe_client::{HistoryStore, Role};
use anyhow::Context;
use clap::Args;

#[derive(Args)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(clap::Subcommand)]
pub enum HistoryCommands {
    /// List a role's sent-message history
    List {
        /// Role whose history to list (agent, presenter, audience)
        #[arg(long)]
        role: String,
        /// History directory (defaults to ~/.aggprobe/history)
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
    /// Show one history entry as pretty JSON
    Show {
        /// Role whose history to read (agent, presenter, audience)
        #[arg(long)]
        role: String,
        /// 1-based entry number as printed by `list`
        #[arg(long)]
        index: usize,
        /// History directory (defaults to ~/.aggprobe/history)
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
}

pub fn run(args: HistoryArgs) -> anyhow::Result<()> {
    match args.command {
        HistoryCommands::List { role, state_dir } => {
            let role: Role = role.parse()?;
            let store = open_store(state_dir)?;
            let records = store.list(role);
            if records.is_empty() {
                println!("no message history for {role} yet");
                return Ok(());
            }
            for (index, record) in records.iter().enumerate() {
                println!(
                    "No.{} [requestType]: {} [data]: {}",
                    index + 1,
                    record.request_type,
                    record.data
                );
            }
            Ok(())
        }
        HistoryCommands::Show { role, index, state_dir } => {
            let role: Role = role.parse()?;
            let store = open_store(state_dir)?;
            match index.checked_sub(1).and_then(|index| store.get(role, index)) {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("no history entry No.{index} for {role}"),
            }
            Ok(())
        }
    }
}

pub(crate) fn open_store(state_dir: Option<PathBuf>) -> anyhow::Result<HistoryStore> {
    let dir = match state_dir {
        Some(dir) => dir,
        None => HistoryStore::default_dir()
            .context("cannot locate a home directory; pass --state-dir")?,
    };
    Ok(HistoryStore::new(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_state_dir_wins_over_the_default() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = open_store(Some(tmp.path().to_path_buf())).expect("store");
        assert_eq!(store.dir(), tmp.path());
    }
}
