//! The executor: turns a parsed [`CommandNode`] chain into running
//! processes, wires up pipes and redirections, and manages the
//! foreground/background terminal handoff around them.

use std::ffi::CString;
use std::os::unix::io::AsRawFd;

use tracing::warn;

use crate::builtins;
use crate::cmd::{CommandNode, Connector};
use crate::env::EnvStore;
use crate::error::{FatalExt, Result, ShellError};
use crate::job::{Job, ProcessStatus};
use crate::jobtable::JobTable;
use crate::posix::{self, WaitStatus};
use crate::terminal;

/// Owns the job table and talks to the controlling terminal; one instance
/// lives for the whole shell session.
pub struct Executor {
    pub jobs: JobTable,
    pub env: EnvStore,
    pub shell_pgid: i32,
    pub tty_fd: i32,
    /// Whether `tty_fd` is an actual controlling terminal. `-c` mode and
    /// profile loading run with stdin redirected from a file or pipe, in
    /// which case there is no terminal to hand foreground ownership to
    /// or take back, and `waitforjob` skips those calls entirely.
    pub has_tty: bool,
    pub last_status: i32,
}

impl Executor {
    pub fn new(tty_fd: i32) -> Executor {
        Executor {
            jobs: JobTable::new(),
            env: EnvStore::new(),
            shell_pgid: posix::getpgrp(),
            tty_fd,
            has_tty: posix::isatty(tty_fd),
            last_status: 0,
        }
    }

    /// Runs one parsed command chain, following its connectors, and
    /// leaves `self.last_status` set to the status of the last foreground
    /// thing that ran.
    pub fn run(&mut self, tree: CommandNode) -> Result<()> {
        let mut node = Some(tree);
        while let Some(mut n) = node {
            if matches!(n.mode, Connector::Pipe | Connector::PipeErr) {
                let mut pipeline = Vec::new();
                let after = loop {
                    let cur_mode = n.mode;
                    let next = n.next.take().map(|b| *b);
                    pipeline.push(n);
                    match (cur_mode, next) {
                        (Connector::Pipe, Some(next_node)) | (Connector::PipeErr, Some(next_node)) => {
                            n = next_node;
                        }
                        (_, next_opt) => break next_opt,
                    }
                };
                let background = pipeline.last().unwrap().mode == Connector::Background;
                self.exec_pipeline(pipeline, background)?;
                node = after;
            } else {
                let background = n.mode == Connector::Background;
                let next = n.next.take().map(|b| *b);
                self.exec_one(n, background)?;
                node = next;
            }
        }
        Ok(())
    }

    /// Runs a single node (no pipe), either in the foreground (waiting for
    /// it) or backgrounded.
    fn exec_one(&mut self, node: CommandNode, background: bool) -> Result<()> {
        if let Some(code) = builtins::try_run(self, &node, background)? {
            self.last_status = code;
            return Ok(());
        }
        let cmd_str = node.render_chain();
        let argv = build_argv(&node);
        let path = resolve_command(&self.env, &node.name)?;
        let (stdin_redirect, stdout_redirect) = build_redirections(&node)?;

        let pid = posix::fork().fatal_ctx("fork")?;
        if pid == 0 {
            child_setup();
            apply_redirections(stdin_redirect, stdout_redirect);
            exec_child(&path, &argv, &self.env);
        }

        posix::setpgid(pid, pid).ok();

        let mut job = Job::new(pid, cmd_str, background);
        job.procs.push(ProcessStatus::new(pid));
        let id = self.jobs.make_job(job);

        if background {
            eprintln!("[{id}] {pid}");
            Ok(())
        } else {
            self.waitforjob(id)
        }
    }

    /// Runs a chain of piped nodes as one job.
    fn exec_pipeline(&mut self, nodes: Vec<CommandNode>, background: bool) -> Result<()> {
        let n = nodes.len();
        // `nodes` were unlinked from their `next` pointers while being
        // collected out of the parsed chain, so `render_chain` (which
        // walks `next`) can't be used here; render from the vector itself.
        let cmd_str = render_pipeline(&nodes);

        // Resolve every stage's command before forking any of them: if a
        // later stage doesn't exist, earlier stages must never have been
        // started, since nothing would ever reap them otherwise.
        let paths: Vec<String> = nodes
            .iter()
            .map(|node| resolve_command(&self.env, &node.name))
            .collect::<Result<_>>()?;

        let mut pipes: Vec<(std::fs::File, std::fs::File)> = Vec::with_capacity(n - 1);
        for _ in 0..n - 1 {
            pipes.push(posix::pipe().fatal_ctx("pipe")?);
        }

        let mut pgid: Option<i32> = None;
        let mut pids = Vec::with_capacity(n);

        for (i, node) in nodes.iter().enumerate() {
            let argv = build_argv(node);
            let path = &paths[i];
            let merge_stderr = i > 0 && nodes[i - 1].mode == Connector::PipeErr;
            let (node_in, node_out) = build_redirections(node)?;

            let pid = posix::fork().fatal_ctx("fork")?;
            if pid == 0 {
                child_setup();
                posix::setpgid(0, pgid.unwrap_or(0)).ok();

                if i > 0 {
                    let read_end = pipes[i - 1].0.as_raw_fd();
                    posix::dup2(read_end, 0).expect("dup2 stdin");
                }
                if i < n - 1 {
                    let write_end = pipes[i].1.as_raw_fd();
                    posix::dup2(write_end, 1).expect("dup2 stdout");
                    if merge_stderr {
                        posix::dup2(write_end, 2).expect("dup2 stderr");
                    }
                }
                for (r, w) in &pipes {
                    let _ = posix::close(r.as_raw_fd());
                    let _ = posix::close(w.as_raw_fd());
                }
                apply_redirections(node_in, node_out);
                exec_child(path, &argv, &self.env);
            }

            posix::setpgid(pid, pgid.unwrap_or(pid)).ok();
            if pgid.is_none() {
                pgid = Some(pid);
            }
            pids.push(pid);
        }

        drop(pipes);

        let pgid = pgid.expect("pipeline always has at least one node");
        let mut job = Job::new(pgid, cmd_str, background);
        for pid in pids {
            job.procs.push(ProcessStatus::new(pid));
        }
        let id = self.jobs.make_job(job);

        if background {
            eprintln!("[{id}] {pgid}");
            Ok(())
        } else {
            self.waitforjob(id)
        }
    }

    /// Gives the terminal to `id`'s process group, waits for it to finish
    /// or stop, then takes the terminal back for the shell.
    pub fn waitforjob(&mut self, id: i64) -> Result<()> {
        let pgid = match self.jobs.get(id) {
            Some(job) => job.pgid,
            None => return Ok(()),
        };

        if self.has_tty {
            terminal::set_foreground(self.tty_fd, pgid).fatal_ctx("tcsetpgrp")?;
        }

        loop {
            match posix::waitpid(-pgid, posix::WUNTRACED) {
                Ok(Some((pid, status))) => {
                    self.record_status(id, pid, status);
                    let done = self.jobs.get(id).map(|j| j.all_done()).unwrap_or(true);
                    let stopped = self.jobs.get(id).map(|j| j.any_stopped()).unwrap_or(false);
                    if done || stopped {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) if e.raw_os_error() == Some(posix::ECHILD) => break,
                Err(e) => return Err(ShellError::fatal("waitpid", e)),
            }
        }

        if self.has_tty {
            terminal::set_foreground(self.tty_fd, self.shell_pgid).fatal_ctx("tcsetpgrp")?;
        }

        if let Some(job) = self.jobs.get(id) {
            use crate::job::JobStatus;
            match job.classify() {
                JobStatus::Stopped => {
                    eprintln!("[{id}]  Stopped                 {}", job.cmd);
                }
                JobStatus::Done | JobStatus::Killed | JobStatus::Terminated => {
                    self.last_status = job.procs.last().map(|p| exit_code(p.status)).unwrap_or(0);
                    self.jobs.free_job(id);
                }
                JobStatus::Running => {}
            }
        }
        Ok(())
    }

    fn record_status(&mut self, id: i64, pid: i32, status: WaitStatus) {
        if let Some(job) = self.jobs.get_mut(id) {
            if let Some(p) = job.procs.iter_mut().find(|p| p.pid == pid) {
                p.status = Some(status);
            }
        }
    }

    /// Non-blocking reap pass over every job, run at the top of each REPL
    /// iteration. Reports newly finished/stopped jobs and frees the ones
    /// that are fully done, unless `update_only` is set (used right
    /// before exiting, where printing would be pointless).
    pub fn reapjobs(&mut self, update_only: bool) {
        let mut finished = Vec::new();
        let mut ids: Vec<i64> = Vec::new();
        self.jobs.for_each(|id, _| ids.push(id));

        for id in ids {
            let pgid = match self.jobs.get(id) {
                Some(j) => j.pgid,
                None => continue,
            };
            loop {
                match posix::waitpid(-pgid, posix::WNOHANG | posix::WUNTRACED) {
                    Ok(Some((pid, status))) => self.record_status(id, pid, status),
                    Ok(None) => break,
                    Err(e) if e.raw_os_error() == Some(posix::ECHILD) => break,
                    Err(e) => {
                        warn!(error = %e, "waitpid failed during reap");
                        break;
                    }
                }
            }
            if let Some(job) = self.jobs.get(id) {
                if job.all_done() {
                    finished.push(id);
                }
            }
        }
        if update_only {
            return;
        }
        for id in finished {
            if let Some(job) = self.jobs.get(id) {
                use crate::job::JobStatus;
                let label = job.classify().label();
                println!("[{id}]  {label:<24} {}", job.cmd);
            }
            self.jobs.free_job(id);
        }
    }

    /// Sends SIGTERM to every job's process group; used on shell
    /// shutdown when suspended jobs remain.
    pub fn killsuspjobs(&mut self) {
        let mut pgids = Vec::new();
        self.jobs.for_each(|_, job| pgids.push(job.pgid));
        for pgid in pgids {
            let _ = posix::killpg(pgid, posix::SIGTERM);
        }
    }
}

fn exit_code(status: Option<WaitStatus>) -> i32 {
    match status {
        Some(WaitStatus::Exited(code)) => code,
        Some(WaitStatus::Signaled(sig)) => 128 + sig,
        _ => 0,
    }
}

fn render_pipeline(nodes: &[CommandNode]) -> String {
    let mut out = String::new();
    for (i, node) in nodes.iter().enumerate() {
        out.push_str(&node.name);
        for a in &node.args {
            out.push(' ');
            out.push_str(a);
        }
        if i + 1 < nodes.len() {
            out.push_str(match node.mode {
                Connector::PipeErr => " |& ",
                _ => " | ",
            });
        }
    }
    out
}

fn build_argv(node: &CommandNode) -> Vec<String> {
    let mut argv = Vec::with_capacity(node.args.len() + 1);
    argv.push(node.name.clone());
    argv.extend(node.args.iter().map(|a| CommandNode::process_arg(a)));
    argv
}

/// Resolves `name` against the shell's own `PATH` entry, or validates a
/// literal path, per the same rules as the original lookup: a name
/// starting with `/`, `./`, or `../` is used as-is, everything else is
/// searched for across `PATH` entries. `PATH` comes from the shell's own
/// env store, never the host process's real environment.
fn resolve_command(env: &EnvStore, name: &str) -> Result<String> {
    if name.starts_with('/') || name.starts_with("./") || name.starts_with("../") {
        if std::path::Path::new(name).is_file() {
            return Ok(name.to_owned());
        }
        return Err(ShellError::CommandNotFound(name.to_owned()));
    }
    let path_var = env.get("PATH").unwrap_or("");
    for dir in path_var.split(':') {
        let candidate = if dir.is_empty() {
            name.to_owned()
        } else {
            format!("{dir}/{name}")
        };
        if std::path::Path::new(&candidate).is_file() {
            return Ok(candidate);
        }
    }
    Err(ShellError::CommandNotFound(name.to_owned()))
}

enum Redir {
    In(CString),
    Out {
        path: CString,
        append: bool,
        redirect_stderr: bool,
    },
}

fn build_redirections(node: &CommandNode) -> Result<(Option<Redir>, Option<Redir>)> {
    let file_in = node
        .file_in
        .as_ref()
        .map(|p| posix::path_to_cstring(p))
        .transpose()
        .map_err(|e| ShellError::fatal("open", e))?
        .map(Redir::In);
    let file_out = node
        .file_out
        .as_ref()
        .map(|r| {
            posix::path_to_cstring(&r.path).map(|path| Redir::Out {
                path,
                append: r.append,
                redirect_stderr: r.redirect_stderr,
            })
        })
        .transpose()
        .map_err(|e| ShellError::fatal("open", e))?;
    Ok((file_in, file_out))
}

/// Must only be called after `fork`, in the child. Output redirection
/// wins over a pipe connection: it is applied after the pipe-end dup2,
/// last write wins.
fn apply_redirections(stdin: Option<Redir>, stdout: Option<Redir>) {
    if let Some(Redir::In(path)) = stdin {
        let fd = posix::open(&path, posix::O_RDONLY, 0).expect("open stdin redirection");
        posix::dup2(fd, 0).expect("dup2 stdin redirection");
        let _ = posix::close(fd);
    }
    if let Some(Redir::Out {
        path,
        append,
        redirect_stderr,
    }) = stdout
    {
        let flags = posix::O_WRONLY
            | posix::O_CREAT
            | if append { posix::O_APPEND } else { posix::O_TRUNC };
        let fd = posix::open(&path, flags, 0o644).expect("open stdout redirection");
        posix::dup2(fd, 1).expect("dup2 stdout redirection");
        if redirect_stderr {
            posix::dup2(fd, 2).expect("dup2 stderr redirection");
        }
        let _ = posix::close(fd);
    }
}

/// Child-side setup shared by single commands and pipeline stages: join
/// a (possibly fresh) process group and restore default dispositions for
/// the signals the shell itself ignores or intercepts, so a foreground
/// child behaves like an ordinary job-control-aware program.
fn child_setup() {
    let pid = posix::getpid();
    let _ = posix::setpgid(0, pid);
    let _ = posix::signal_default(posix::SIGINT);
    let _ = posix::signal_default(posix::SIGQUIT);
    let _ = posix::signal_default(posix::SIGHUP);
    let _ = posix::signal_default(posix::SIGTSTP);
    let _ = posix::signal_default(posix::SIGTTIN);
    let _ = posix::signal_default(posix::SIGTTOU);
}

fn exec_child(path: &str, argv: &[String], env: &EnvStore) -> ! {
    let envp = env.export();
    if let Err(e) = posix::execve(path, argv, &envp) {
        eprintln!("{}: {}", argv.first().map(String::as_str).unwrap_or(path), e);
    }
    posix::_exit(127);
}
