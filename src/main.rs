//! localvcs - local change history shell
//!
//! Runs the command shell interactively, or over a script file.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use localvcs::history::{HistoryConfig, LocalHistory};
use localvcs::logging::init_logging;
use localvcs::shell::{Shell, ShellConfig};

#[derive(Parser, Debug)]
#[command(name = "localvcs", version, about = "Local change history over a versioned file tree")]
struct Args {
    /// Read commands from FILE instead of the terminal
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Print structured output (ls, log, origin, tree) as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Compare sibling names case-insensitively
    #[arg(long)]
    case_insensitive: bool,

    /// Keep at most N changesets for undo
    #[arg(long, value_name = "N")]
    max_changesets: Option<usize>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            info!(failures, "script finished with errors");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "localvcs stopped");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<usize, Box<dyn std::error::Error>> {
    // Flags win over LOCALVCS_* variables.
    let mut config = HistoryConfig::from_env()?;
    if args.case_insensitive {
        config = config.case_sensitive(false);
    }
    if args.max_changesets.is_some() {
        config = config.max_changesets(args.max_changesets);
    }

    let history = LocalHistory::new(config)?;
    let mut shell = Shell::with_config(
        history,
        ShellConfig {
            json: args.json,
            ..ShellConfig::default()
        },
    );

    let mut stdout = io::stdout().lock();
    let failures = match args.script {
        Some(path) => {
            let file = File::open(&path)?;
            info!(script = %path.display(), "running script");
            shell.run(BufReader::new(file), &mut stdout, false)?
        }
        None => {
            let stdin = io::stdin().lock();
            // Interactive sessions report errors inline, they do not fail the process.
            shell.run(stdin, &mut stdout, true)?;
            0
        }
    };
    Ok(failures)
}
