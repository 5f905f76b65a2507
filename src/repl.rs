//! The interactive read-eval-print loop and the one-shot (`-c`) entry
//! point built on top of it.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::error::ShellError;
use crate::exec::Executor;
use crate::parser;
use crate::posix;

/// Runs commands from `input` until EOF or a fatal error, printing a
/// `hostname% ` prompt to stderr before each line when `interactive` is
/// set. Mirrors the original's suspended-jobs gate: an EOF while stopped
/// jobs remain is reported once and ignored; a second consecutive EOF
/// exits regardless.
pub fn cmdloop(exec: &mut Executor, input: &mut dyn BufRead, interactive: bool) -> i32 {
    let mut warned_suspended = false;
    let prompt = if interactive {
        posix::gethostname().unwrap_or_else(|_| "ish".to_string())
    } else {
        String::new()
    };

    let mut line = String::new();
    loop {
        if posix::term_requested() {
            exec.killsuspjobs();
            return 1;
        }

        exec.reapjobs(false);

        if interactive {
            eprint!("{prompt}% ");
            let _ = io::stderr().flush();
        }

        line.clear();
        let n = match input.read_line(&mut line) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "read_line failed");
                return 1;
            }
        };

        if n == 0 {
            if exec.jobs.any_stopped() && !warned_suspended {
                eprintln!("There are suspended jobs.");
                warned_suspended = true;
                continue;
            }
            return exec.last_status;
        }
        warned_suspended = false;

        let trimmed = line.trim_end_matches('\n');
        if trimmed.trim().is_empty() {
            continue;
        }

        match parser::parse_line(trimmed) {
            Ok(Some(tree)) => match exec.run(tree) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    if let ShellError::Fatal { op, source } = &e {
                        tracing::error!(op = %op, error = %source, "fatal error, shutting down");
                    }
                    exec.killsuspjobs();
                    return 1;
                }
                Err(e) => {
                    eprintln!("ish: {e}");
                    exec.last_status = 1;
                }
            },
            Ok(None) => {}
            Err(e) => {
                eprintln!("ish: {e}");
                exec.last_status = 1;
            }
        }
    }
}

/// Loads `~/.ishrc` at startup, if it exists. Missing-file is not an
/// error; anything else reading it is reported but does not abort
/// startup.
pub fn loadprofile(exec: &mut Executor) {
    let home = match posix::home_dir() {
        Ok(Some(h)) => h,
        _ => return,
    };
    let path = format!("{home}/.ishrc");
    let file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            warn!(error = %e, path = %path, "could not read profile");
            return;
        }
    };
    let mut reader = io::BufReader::new(file);
    cmdloop(exec, &mut reader, false);
}
