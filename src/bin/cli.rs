//! QuillKV CLI
//!
//! Runs operations directly against a database file, without a server.

use std::fs;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use quillkv::protocol::{parse_json_value, Command, Response};
use quillkv::{CommitMode, Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// QuillKV CLI
#[derive(Parser, Debug)]
#[command(name = "quillkv-cli")]
#[command(about = "CLI for the QuillKV key-value store")]
struct Args {
    /// SQLite database file
    #[arg(short, long, default_value = "./quillkv_data/kv_store.db")]
    db: String,

    /// Commit strategy for batch scripts: replay or atomic
    #[arg(short, long, default_value = "replay")]
    commit_mode: CommitMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Insert a new key with a JSON value
    Set {
        /// The key to set
        key: String,

        /// The value, as JSON
        value: String,
    },

    /// Overwrite an existing key with a JSON value
    Update {
        /// The key to update
        key: String,

        /// The value, as JSON
        value: String,
    },

    /// Delete a key
    #[command(alias = "delete")]
    Del {
        /// The key to delete
        key: String,
    },

    /// Run a script of commands, one per line, in one session
    Batch {
        /// Script file
        file: String,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let config = Config::builder()
        .db_path(&args.db)
        .commit_mode(args.commit_mode)
        .build();

    let engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let commands = match collect_commands(args.command) {
        Ok(commands) => commands,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut ok = true;
    for command in commands {
        let response = Response::from_result(&engine.execute(command));
        ok &= response.is_success();
        println!("{}", response.body);
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn collect_commands(command: Commands) -> quillkv::Result<Vec<Command>> {
    let single = match command {
        Commands::Get { key } => Command::Get { key },
        Commands::Set { key, value } => Command::Set {
            key,
            value: parse_json_value(&value)?,
        },
        Commands::Update { key, value } => Command::Update {
            key,
            value: parse_json_value(&value)?,
        },
        Commands::Del { key } => Command::Delete { key },
        Commands::Batch { file } => {
            let script = fs::read_to_string(&file)?;
            let mut commands = Vec::new();
            for (line_no, line) in script.lines().enumerate() {
                let parsed = Command::parse_line(line).map_err(|e| {
                    quillkv::QuillError::Protocol(format!("{}:{}: {}", file, line_no + 1, e.message()))
                })?;
                commands.extend(parsed);
            }
            return Ok(commands);
        }
    };
    Ok(vec![single])
}
