//! Core of `ish`, a small interactive POSIX shell with job control.
//!
//! The library half owns the pieces that don't care whether they're
//! driven by a terminal or a test harness: the env store, the command
//! tree, the job table, the executor, and the builtins. The `ish` binary
//! (`src/main.rs`) wires these into a REPL.

pub mod builtins;
pub mod cmd;
pub mod env;
pub mod error;
pub mod exec;
pub mod job;
pub mod jobtable;
pub mod parser;

#[cfg(unix)]
pub mod posix;

pub mod repl;
pub mod terminal;

pub use cmd::{CommandNode, Connector, OutputRedirection};
pub use env::EnvStore;
pub use error::{Result, ShellError};
pub use exec::Executor;
pub use job::{Job, JobStatus, ProcessStatus};
pub use jobtable::JobTable;
