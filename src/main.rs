//! `ish` binary entry point: CLI parsing, logging setup, and handing off
//! to the REPL.

use std::io::{self, BufRead};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ish::exec::Executor;
use ish::{posix, repl};

/// A small interactive POSIX shell with job control.
#[derive(Parser, Debug)]
#[command(name = "ish", about, disable_version_flag = true)]
struct Cli {
    /// Run a single command line non-interactively and exit.
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,

    /// Print the version and exit.
    #[arg(short = 'v', long = "version")]
    version: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ISH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if cli.version {
        println!("ish {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    posix::install_term_handler().expect("installing SIGTERM handler");

    let tty_fd = 0;
    let mut exec = Executor::new(tty_fd);

    let status = if let Some(command) = cli.command {
        match ish::parser::parse_line(&command) {
            Ok(Some(tree)) => match exec.run(tree) {
                Ok(()) => exec.last_status,
                Err(e) => {
                    eprintln!("ish: {e}");
                    1
                }
            },
            Ok(None) => 0,
            Err(e) => {
                eprintln!("ish: {e}");
                1
            }
        }
    } else {
        repl::loadprofile(&mut exec);
        let stdin = io::stdin();
        let mut lock = stdin.lock();
        let interactive = posix::isatty(0);
        repl::cmdloop(&mut exec, &mut lock as &mut dyn BufRead, interactive)
    };

    std::process::exit(status);
}
