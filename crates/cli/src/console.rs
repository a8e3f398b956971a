//! Interactive console: one panel per role, driven by line commands.

use std::path::PathBuf;

use aggprobe_client::{
    Bootstrapper, HistoryStore, RegistrationExtras, Role, SessionPhase, Workbench,
};
use clap::Args;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const ENV_BASE_URL: &str = "AGGPROBE_BASE_URL";
/// Device tag the aggregator expects from presentation agents.
pub const DEFAULT_AGENT_TYPE: &str = "SHOW_PRESENTATION_COMPUTER";

#[derive(Args)]
pub struct ConsoleArgs {
    /// Verification endpoint base URL (falls back to AGGPROBE_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,
    /// History directory (defaults to ~/.aggprobe/history)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
    /// Display name sent in the agent registration payload
    #[arg(long, default_value = "aggprobe")]
    pub agent_name: String,
    /// Device tag sent in the agent registration payload
    #[arg(long, default_value = DEFAULT_AGENT_TYPE)]
    pub agent_type: String,
}

pub async fn run(args: ConsoleArgs) -> anyhow::Result<()> {
    let base_url = resolve_base_url(args.base_url.as_deref());
    let bootstrapper = Bootstrapper::new(&base_url)?;
    let store = super::history_cli::open_store(args.state_dir.clone())?;
    let mut bench = Workbench::new(bootstrapper, store);

    println!("aggprobe console against {base_url} (type 'help' for commands)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        match command {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Status => {
                for role in Role::ALL {
                    println!("[{role}] {}", bench.phase(role));
                }
            }
            Command::Connect { role, otp } => {
                let extras = extras_for(role, &args);
                let (progress, phases) = watch::channel(SessionPhase::Idle);
                spawn_phase_printer(role, phases);
                match bench.connect_with_progress(role, &otp, &extras, progress).await {
                    Ok(()) => spawn_frame_printer(role, &bench),
                    Err(error) => println!("[{role}] connect failed: {error}"),
                }
            }
            Command::Send { role, request_type, data } => {
                match bench.send(role, &request_type, &data).await {
                    Ok(record) => {
                        println!("[{role}] sent: {}", serde_json::to_string(&record)?);
                    }
                    Err(error) => println!("[{role}] send failed: {error}"),
                }
            }
            Command::History { role } => print_history(bench.history(), role),
            Command::Replay { role, number } => match number.checked_sub(1) {
                None => println!("[{role}] no history entry No.{number}"),
                Some(index) => match bench.resend(role, index).await {
                    Ok(Some(record)) => {
                        println!("[{role}] resent: {}", serde_json::to_string(&record)?);
                    }
                    Ok(None) => println!("[{role}] no history entry No.{number}"),
                    Err(error) => println!("[{role}] resend failed: {error}"),
                },
            },
            Command::Close { role } => {
                if bench.close(role).await {
                    println!("[{role}] closed");
                } else {
                    println!("[{role}] not connected");
                }
            }
        }
    }
    Ok(())
}

fn spawn_phase_printer(role: Role, mut phases: watch::Receiver<SessionPhase>) {
    tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            let phase = *phases.borrow();
            println!("[{role}] {phase}");
            if phase.is_terminal() {
                break;
            }
        }
    });
}

fn spawn_frame_printer(role: Role, bench: &Workbench) {
    let Some(connection) = bench.connection(role) else {
        return;
    };
    let frames = connection.frames();
    tokio::spawn(async move {
        let mut frames = frames.lock().await;
        while let Some(frame) = frames.recv().await {
            println!("[{role}] recv: {frame}");
        }
    });
}

fn print_history(store: &HistoryStore, role: Role) {
    let records = store.list(role);
    if records.is_empty() {
        println!("[{role}] no message history yet");
        return;
    }
    for (index, record) in records.iter().enumerate() {
        println!(
            "No.{} [requestType]: {} [data]: {}",
            index + 1,
            record.request_type,
            record.data
        );
    }
}

fn print_help() {
    println!("commands:");
    println!("  connect <role> <otp>               verify the OTP and open the role's connection");
    println!("  send <role> <requestType> <json>   send one message and record it in history");
    println!("  history <role>                     list the role's sent-message history");
    println!("  replay <role> <No.>                re-send a history entry verbatim");
    println!("  close <role>                       close the role's connection");
    println!("  status                             show every role's phase");
    println!("  help, quit");
    println!("roles: agent, presenter, audience");
}

fn extras_for(role: Role, args: &ConsoleArgs) -> RegistrationExtras {
    let mut extras = RegistrationExtras::new();
    if role == Role::Agent {
        extras.insert("agentName".to_string(), Value::String(args.agent_name.clone()));
        extras.insert("agentType".to_string(), Value::String(args.agent_type.clone()));
    }
    extras
}

pub(crate) fn resolve_base_url(flag: Option<&str>) -> String {
    if let Some(url) = flag {
        let trimmed = url.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    if let Ok(url) = std::env::var(ENV_BASE_URL) {
        let trimmed = url.trim().trim_end_matches('/').to_string();
        if !trimmed.is_empty() {
            return trimmed;
        }
    }
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, PartialEq)]
pub(crate) enum Command {
    Connect { role: Role, otp: String },
    Send { role: Role, request_type: String, data: String },
    History { role: Role },
    Replay { role: Role, number: usize },
    Close { role: Role },
    Status,
    Help,
    Quit,
}

/// Parse one console line. `Ok(None)` for blank input; `Err` carries the
/// message to print back to the operator.
pub(crate) fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let (verb, rest) = next_token(line);
    if verb.is_empty() {
        return Ok(None);
    }
    match verb {
        "connect" => {
            let (role, rest) = next_token(rest);
            let (otp, rest) = next_token(rest);
            if role.is_empty() || otp.is_empty() || !rest.is_empty() {
                return Err("usage: connect <role> <otp>".to_string());
            }
            Ok(Some(Command::Connect {
                role: parse_role(role)?,
                otp: otp.to_string(),
            }))
        }
        "send" => {
            let (role, rest) = next_token(rest);
            let (request_type, data) = next_token(rest);
            if role.is_empty() || request_type.is_empty() || data.is_empty() {
                return Err("usage: send <role> <requestType> <json>".to_string());
            }
            Ok(Some(Command::Send {
                role: parse_role(role)?,
                request_type: request_type.to_string(),
                data: data.to_string(),
            }))
        }
        "history" => {
            let (role, rest) = next_token(rest);
            if role.is_empty() || !rest.is_empty() {
                return Err("usage: history <role>".to_string());
            }
            Ok(Some(Command::History { role: parse_role(role)? }))
        }
        "replay" => {
            let (role, rest) = next_token(rest);
            let (number, rest) = next_token(rest);
            if role.is_empty() || number.is_empty() || !rest.is_empty() {
                return Err("usage: replay <role> <No.>".to_string());
            }
            let number = number
                .parse::<usize>()
                .map_err(|_| format!("'{number}' is not a history entry number"))?;
            Ok(Some(Command::Replay {
                role: parse_role(role)?,
                number,
            }))
        }
        "close" => {
            let (role, rest) = next_token(rest);
            if role.is_empty() || !rest.is_empty() {
                return Err("usage: close <role>".to_string());
            }
            Ok(Some(Command::Close { role: parse_role(role)? }))
        }
        "status" => Ok(Some(Command::Status)),
        "help" => Ok(Some(Command::Help)),
        "quit" | "exit" => Ok(Some(Command::Quit)),
        other => Err(format!("unknown command '{other}' (type 'help')")),
    }
}

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse::<Role>().map_err(|error| error.to_string())
}

/// First whitespace-delimited token and the trimmed remainder.
fn next_token(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(end) => (&input[..end], input[end..].trim_start()),
        None => (input, ""),
    }
}
