//! The closed set of builtins that run in the shell's own process rather
//! than a forked child: `exit`, `cd`, `jobs`, `kill`, `bg`, `fg`,
//! `setenv`, `unsetenv`.
//!
//! A backgrounded builtin still forks (its state changes would otherwise
//! vanish with the child, same as the original), so only the foreground
//! path actually runs in-process.

use crate::cmd::CommandNode;
use crate::error::Result;
use crate::exec::Executor;
use crate::posix;

/// Names the executor recognizes as builtins, checked before falling
/// back to `PATH` resolution.
fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "exit" | "cd" | "jobs" | "kill" | "bg" | "fg" | "setenv" | "unsetenv"
    )
}

/// Runs `node` as a builtin if its name is one, returning its exit code.
/// Returns `Ok(None)` for anything that isn't a builtin, so the caller
/// falls through to ordinary command resolution.
///
/// A backgrounded builtin is forked like any other command: it still
/// needs to run as a separate process to be "in the background" at all,
/// which means its effect on shell state (an `fg`, a `cd`) is invisible
/// to the parent shell, exactly as the spec requires.
pub fn try_run(exec: &mut Executor, node: &CommandNode, background: bool) -> Result<Option<i32>> {
    if !is_builtin(&node.name) {
        return Ok(None);
    }
    if background {
        return Ok(Some(run_backgrounded(exec, node)));
    }
    let args: Vec<String> = node.args.iter().map(|a| CommandNode::process_arg(a)).collect();
    Ok(Some(dispatch(exec, &node.name, &args)))
}

fn run_backgrounded(exec: &mut Executor, node: &CommandNode) -> i32 {
    let args: Vec<String> = node.args.iter().map(|a| CommandNode::process_arg(a)).collect();
    match posix::fork() {
        Ok(0) => {
            let code = dispatch(exec, &node.name, &args);
            posix::_exit(code as u8);
        }
        Ok(pid) => {
            eprintln!("[bg] {pid}");
            0
        }
        Err(e) => {
            eprintln!("{}: fork: {e}", node.name);
            1
        }
    }
}

fn dispatch(exec: &mut Executor, name: &str, args: &[String]) -> i32 {
    match name {
        "exit" => builtin_exit(exec, args),
        "cd" => builtin_cd(exec, args),
        "jobs" => builtin_jobs(exec, args),
        "kill" => builtin_kill(exec, args),
        "bg" => builtin_bg(exec, args),
        "fg" => builtin_fg(exec, args),
        "setenv" => builtin_setenv(exec, args),
        "unsetenv" => builtin_unsetenv(exec, args),
        _ => unreachable!("dispatch only called for is_builtin names"),
    }
}

fn usage(name: &str, form: &str) -> i32 {
    eprintln!("usage: {name} {form}");
    1
}

/// `exit` takes no arguments; any given is a usage error, not a custom
/// exit code. Suspended jobs are sent SIGTERM+SIGCONT before the shell
/// itself exits, so they don't linger as orphaned stopped processes.
fn builtin_exit(exec: &mut Executor, args: &[String]) -> i32 {
    if !args.is_empty() {
        eprintln!("usage: exit");
        return 1;
    }
    exec.killsuspjobs();
    posix::_exit(0);
}

fn builtin_cd(_exec: &mut Executor, args: &[String]) -> i32 {
    let target = match args.first() {
        Some(path) => Some(path.clone()),
        None => match posix::home_dir() {
            Ok(Some(home)) => Some(home),
            Ok(None) => None,
            Err(e) => {
                eprintln!("cd: {e}");
                return 1;
            }
        },
    };
    let Some(target) = target else {
        eprintln!("cd: no home directory set");
        return 1;
    };
    if let Err(e) = std::env::set_current_dir(&target) {
        eprintln!("cd: {target}: {e}");
        return 1;
    }
    0
}

fn parse_job_id(arg: &str) -> Option<i64> {
    arg.strip_prefix('%').unwrap_or(arg).parse().ok()
}

fn builtin_jobs(exec: &mut Executor, _args: &[String]) -> i32 {
    exec.reapjobs(true);
    exec.jobs.for_each(|id, job| {
        println!("[{id}]  {:<24} {}", job.classify().label(), job.cmd);
    });
    0
}

fn builtin_kill(exec: &mut Executor, args: &[String]) -> i32 {
    if args.is_empty() {
        return usage("kill", "%job [...]");
    }
    let mut status = 0;
    for arg in args {
        match parse_job_id(arg) {
            Some(id) => match exec.jobs.get(id) {
                Some(job) => {
                    if posix::killpg(job.pgid, posix::SIGTERM).is_err() {
                        eprintln!("kill: {arg}: {}", std::io::Error::last_os_error());
                        status = 1;
                    }
                    // A stopped job never gets scheduled to see the
                    // SIGTERM above; wake it so it can act on it.
                    let _ = posix::killpg(job.pgid, posix::SIGCONT);
                }
                None => {
                    eprintln!("kill: no such job: {arg}");
                    status = 1;
                }
            },
            None => {
                eprintln!("kill: invalid job spec: {arg}");
                status = 1;
            }
        }
    }
    status
}

fn builtin_bg(exec: &mut Executor, args: &[String]) -> i32 {
    let Some(id) = args.first().and_then(|a| parse_job_id(a)) else {
        return usage("bg", "%job");
    };
    let Some(job) = exec.jobs.get(id) else {
        eprintln!("bg: no such job: {id}");
        return 1;
    };
    let pgid = job.pgid;
    let cmd = job.cmd.clone();
    if posix::killpg(pgid, posix::SIGCONT).is_err() {
        eprintln!("bg: {id}: {}", std::io::Error::last_os_error());
        return 1;
    }
    if let Some(job) = exec.jobs.get_mut(id) {
        for p in &mut job.procs {
            if matches!(p.status, Some(posix::WaitStatus::Stopped(_))) {
                p.status = None;
            }
        }
    }
    eprintln!("[{id}] {cmd} &");
    0
}

fn builtin_fg(exec: &mut Executor, args: &[String]) -> i32 {
    let Some(id) = args.first().and_then(|a| parse_job_id(a)) else {
        return usage("fg", "%job");
    };
    if exec.jobs.get(id).is_none() {
        eprintln!("fg: no such job: {id}");
        return 1;
    }
    eprintln!("{}", exec.jobs.get(id).unwrap().cmd);
    let _ = posix::killpg(exec.jobs.get(id).unwrap().pgid, posix::SIGCONT);
    if let Some(job) = exec.jobs.get_mut(id) {
        for p in &mut job.procs {
            if matches!(p.status, Some(posix::WaitStatus::Stopped(_))) {
                p.status = None;
            }
        }
    }
    match exec.waitforjob(id) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("fg: {e}");
            1
        }
    }
}

fn builtin_setenv(exec: &mut Executor, args: &[String]) -> i32 {
    match args.len() {
        0 => {
            exec.env.display();
            0
        }
        1 => {
            exec.env.set(&args[0], None);
            0
        }
        2 => {
            exec.env.set(&args[0], Some(&args[1]));
            0
        }
        _ => usage("setenv", "[name [value]]"),
    }
}

fn builtin_unsetenv(exec: &mut Executor, args: &[String]) -> i32 {
    let Some(name) = args.first() else {
        return usage("unsetenv", "name");
    };
    exec.env.unset(name);
    0
}
