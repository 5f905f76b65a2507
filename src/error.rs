//! Error model for the shell core.
//!
//! The spec draws a hard line between two kinds of failure: **fatal**
//! errors, which invalidate the shell's own invariants and must terminate
//! it, and **command-scoped** errors, which are reported and leave the
//! shell running for the next prompt. [`ShellError`] keeps that
//! distinction in the type rather than in a convention, via
//! [`ShellError::is_fatal`].

use std::io;

/// Something went wrong while running a command or maintaining shell state.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// A system call that the shell's own bookkeeping depends on failed.
    /// These calls are not expected to fail in a correctly functioning
    /// system; when one does, the shell's state can no longer be trusted.
    #[error("{op}: {source}")]
    Fatal {
        /// Name of the failing syscall, for the diagnostic.
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// A command could not be resolved against `PATH`.
    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// `cd`, a job-control builtin, or a redirection target failed in a
    /// way that is scoped to the command being run, not the shell itself.
    #[error("{0}")]
    CommandFailed(String),

    /// No job currently occupies the referenced slot.
    #[error("no such job: {0}")]
    NoSuchJob(i64),
}

impl ShellError {
    /// True for errors that must unwind the shell process itself (after
    /// running the suspended-job release path), false for errors that are
    /// reported and leave the REPL running.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Fatal { .. })
    }

    /// Wrap an [`io::Error`] as a fatal failure of the named syscall.
    pub fn fatal(op: &'static str, source: io::Error) -> ShellError {
        ShellError::Fatal { op, source }
    }
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, ShellError>;

/// Turns a fatal [`io::Error`] from a named syscall into a [`ShellError`],
/// for use with `?` at call sites that only ever see fatal failures from
/// that syscall (the fatal/command-scoped call sites differ in whether
/// they propagate via `?` into `ShellError::Fatal` or handle the error
/// locally and print a warning instead).
pub(crate) trait FatalExt<T> {
    fn fatal_ctx(self, op: &'static str) -> Result<T>;
}

impl<T> FatalExt<T> for io::Result<T> {
    fn fatal_ctx(self, op: &'static str) -> Result<T> {
        self.map_err(|e| ShellError::fatal(op, e))
    }
}
