// ABOUTME: Entry point for clawlog — inspect and edit per-session conversation logs.
// ABOUTME: Parses CLI args, loads config, opens the LogStore, and runs one subcommand.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use clawlog::config::Config;
use clawlog::logging::init_logging;
use clawlog::session::{Entry, Format, LogStore, Message, Role};

#[derive(Debug, Parser)]
#[command(name = "clawlog", version, about = "Durable per-session conversation history")]
struct Cli {
    /// Session log directory (overrides config).
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Log format: jsonl or markdown (overrides config).
    #[arg(long, global = true)]
    format: Option<Format>,

    /// Refuse to read session files larger than this many bytes.
    #[arg(long, global = true)]
    max_size: Option<u64>,

    /// Config file to load instead of ~/.clawlog/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List session ids stored in the active format.
    List,
    /// Print a session's messages.
    Show {
        session: String,
        /// Only the final N messages.
        #[arg(long)]
        last: Option<usize>,
        /// Print JSON records instead of a transcript.
        #[arg(long)]
        raw: bool,
    },
    /// Append one message to a session.
    Write {
        session: String,
        #[arg(long, default_value = "user")]
        role: String,
        #[arg(long)]
        tool_call_id: Option<String>,
        content: String,
    },
    /// Exit with status 0 if the session exists, 1 otherwise.
    Exists { session: String },
    /// Truncate a session's log, keeping the file.
    Clear { session: String },
    /// Remove a session's log file.
    Delete { session: String },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.dir {
        config.store.base_dir = Some(dir);
    }
    if let Some(format) = cli.format {
        config.store.format = format;
    }
    if let Some(max) = cli.max_size {
        config.store.max_file_size = Some(max);
    }

    let store = LogStore::from_config(&config.store)?;

    match cli.command {
        Command::List => {
            for session in store.sessions()? {
                println!("{}", session);
            }
        }
        Command::Show { session, last, raw } => {
            let entries = match last {
                Some(n) => store.last_n_entries(&session, n)?,
                None => store.read_entries(&session)?.entries,
            };
            let render = if raw { Format::Jsonl } else { Format::Markdown };
            print!("{}", render.render(&entries)?);
        }
        Command::Write {
            session,
            role,
            tool_call_id,
            content,
        } => {
            let message = Message {
                role: Role::from(role),
                content,
                tool_call_id,
            };
            store.write_entry(&session, &Entry::now(message))?;
        }
        Command::Exists { session } => {
            if !store.exists(&session)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Clear { session } => store.clear(&session)?,
        Command::Delete { session } => store.delete(&session)?,
    }

    Ok(ExitCode::SUCCESS)
}
