//! flatdb command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Start interactive REPL
//! flatdb --data-dir ./data
//!
//! # Execute a single command
//! flatdb -c "USE shop; SELECT * FROM items"
//!
//! # Execute statements from a file
//! flatdb -f script.sql
//!
//! # Reports
//! flatdb --dump shop -o shop_dump.sql
//! flatdb --erd shop
//! ```

use std::{
    fs,
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context as _, Result};
use clap::Parser;
use flatdb::{
    config::Config,
    export,
    sql::engine::{FlatEngine, Session},
    storage::disk::DiskEngine,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type DiskSession = Session<FlatEngine<DiskEngine>>;

/// flatdb command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "flatdb",
    version,
    about = "Flat-file relational store",
    long_about = "A small relational store that keeps tables in delimited text files.\n\n\
                  Run statements interactively, from a command line or from a script,\n\
                  or export a database as a SQL dump or ERD report."
)]
struct Args {
    /// Data directory
    #[arg(short = 'd', long, value_name = "DIR", env = "FLATDB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Execute statements separated by `;` and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Execute statements from file and exit
    #[arg(short = 'f', long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Print a SQL dump of a database and exit
    #[arg(long, value_name = "DB", conflicts_with = "erd")]
    dump: Option<String>,

    /// Print the ERD report of a database and exit
    #[arg(long, value_name = "DB")]
    erd: Option<String>,

    /// Write reports to this file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Suppress banner and prompts (for scripting)
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every statement succeeded
fn run() -> Result<bool> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref(), args.data_dir.as_deref())
        .context("loading configuration")?;
    init_logging(&config, args.verbose);

    let session = Session::open(&config)
        .with_context(|| format!("opening {}", config.data_dir.display()))?;

    if let Some(db) = &args.dump {
        write_report(&export::dump(session.engine(), db)?, args.output.as_ref())?;
        Ok(true)
    } else if let Some(db) = &args.erd {
        write_report(&export::erd(session.engine(), db)?, args.output.as_ref())?;
        Ok(true)
    } else if let Some(command) = &args.command {
        Ok(execute_script(session, command))
    } else if let Some(file) = &args.file {
        let script = fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        info!("executing script {}", file.display());
        Ok(execute_script(session, &script))
    } else {
        run_repl(session, args.quiet)?;
        Ok(true)
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("flatdb=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn write_report(report: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, report).with_context(|| format!("writing {}", path.display()))?;
            info!("report written to {}", path.display());
        }
        None => print!("{}", report),
    }
    Ok(())
}

/// Runs every statement; failures are reported and execution continues
fn execute_script(mut session: DiskSession, script: &str) -> bool {
    let mut ok = true;
    for stmt in split_statements(script) {
        ok &= execute_one(&mut session, &stmt);
    }
    ok
}

fn execute_one(session: &mut DiskSession, stmt: &str) -> bool {
    match session.execute(stmt) {
        Ok(result) => {
            println!("{}", result);
            true
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            false
        }
    }
}

fn run_repl(mut session: DiskSession, quiet: bool) -> Result<()> {
    if !quiet {
        println!("flatdb {}", env!("CARGO_PKG_VERSION"));
        println!("Statements end with ';'. Type 'exit' to quit.");
    }

    let stdin = io::stdin();
    let mut buffer = String::new();
    loop {
        if !quiet {
            let prompt = match (session.database(), session.in_transaction()) {
                (_, _) if !buffer.is_empty() => "    -> ".to_string(),
                (Some(db), true) => format!("{}*> ", db),
                (Some(db), false) => format!("{}> ", db),
                (None, _) => "flatdb> ".to_string(),
            };
            print!("{}", prompt);
            io::stdout().flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if buffer.is_empty() && matches!(line.trim(), "exit" | "quit" | "\\q") {
            break;
        }
        buffer.push_str(&line);
        if !ends_statement(&buffer) {
            continue;
        }
        for stmt in split_statements(&buffer) {
            execute_one(&mut session, &stmt);
        }
        buffer.clear();
    }

    if session.in_transaction() {
        warn!("exiting with an open transaction, pending statements are discarded");
    }
    Ok(())
}

/// Splits a script on `;` outside single-quoted strings
fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in script.chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                current.push(c);
            }
            ';' if !quoted => {
                statements.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    statements.push(current);
    statements
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// True once the buffer ends with a `;` outside quotes
fn ends_statement(buffer: &str) -> bool {
    let mut quoted = false;
    let mut last = None;
    for c in buffer.chars() {
        if c == '\'' {
            quoted = !quoted;
        }
        if !c.is_whitespace() {
            last = Some(c);
        }
    }
    !quoted && last == Some(';')
}
