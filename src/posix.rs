//! Raw POSIX syscall wrappers, kept in one place so the rest of the crate
//! never touches `unsafe` directly.
//!
//! Every wrapper follows the same shape: call into `libc`, route the
//! return value through [`check_err`], and hand back a `std::io::Result`.

use std::ffi::{CStr, CString, OsStr};
use std::fs::File;
use std::io::{Error, Result};
use std::mem::MaybeUninit;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::FromRawFd;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

fn check_err<T: Ord + Default>(num: T) -> Result<T> {
    if num < T::default() {
        return Err(Error::last_os_error());
    }
    Ok(num)
}

fn os_to_cstring(s: &OsStr) -> Result<CString> {
    CString::new(s.as_bytes()).map_err(|_| Error::from_raw_os_error(libc::EINVAL))
}

fn cstring_ptr(s: &CString) -> *const libc::c_char {
    s.as_ptr()
}

/// Decoded form of a `waitpid` status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Exited(i32),
    Signaled(i32),
    Stopped(i32),
    /// Neither `WIFEXITED`, `WIFSIGNALED`, nor `WIFSTOPPED` matched; the
    /// raw status word is kept for diagnostics.
    Other(i32),
}

fn decode_status(status: libc::c_int) -> WaitStatus {
    unsafe {
        if libc::WIFEXITED(status) {
            WaitStatus::Exited(libc::WEXITSTATUS(status))
        } else if libc::WIFSIGNALED(status) {
            WaitStatus::Signaled(libc::WTERMSIG(status))
        } else if libc::WIFSTOPPED(status) {
            WaitStatus::Stopped(libc::WSTOPSIG(status))
        } else {
            WaitStatus::Other(status)
        }
    }
}

pub fn pipe() -> Result<(File, File)> {
    let mut fds = [0 as libc::c_int; 2];
    check_err(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
    Ok(unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) })
}

pub fn fork() -> Result<i32> {
    check_err(unsafe { libc::fork() })
}

pub fn getpid() -> i32 {
    unsafe { libc::getpid() }
}

pub fn getpgrp() -> i32 {
    unsafe { libc::getpgrp() }
}

/// Puts process `pid` into process group `pgid`. `pid == 0` means "the
/// calling process"; `pgid == 0` means "use `pid` as its own group leader".
pub fn setpgid(pid: i32, pgid: i32) -> Result<()> {
    check_err(unsafe { libc::setpgid(pid, pgid) })?;
    Ok(())
}

/// Makes process group `pgid` the foreground group of the terminal open on
/// `fd`. Callers are expected to have SIGTTOU ignored around this call when
/// invoking it from a background process group.
pub fn tcsetpgrp(fd: i32, pgid: i32) -> Result<()> {
    check_err(unsafe { libc::tcsetpgrp(fd, pgid) })?;
    Ok(())
}

pub fn tcgetpgrp(fd: i32) -> Result<i32> {
    check_err(unsafe { libc::tcgetpgrp(fd) })
}

pub fn isatty(fd: i32) -> bool {
    unsafe { libc::isatty(fd) != 0 }
}

pub fn execve<S1, S2>(cmd: S1, args: &[S2], envp: &[String]) -> Result<()>
where
    S1: AsRef<OsStr>,
    S2: AsRef<OsStr>,
{
    let args_cstring: Vec<CString> = args
        .iter()
        .map(|a| os_to_cstring(a.as_ref()))
        .collect::<Result<_>>()?;
    let mut args_ptr: Vec<*const libc::c_char> = args_cstring.iter().map(cstring_ptr).collect();
    args_ptr.push(ptr::null());

    let env_cstring: Vec<CString> = envp
        .iter()
        .map(|e| CString::new(e.as_bytes()).map_err(|_| Error::from_raw_os_error(libc::EINVAL)))
        .collect::<Result<_>>()?;
    let mut env_ptr: Vec<*const libc::c_char> = env_cstring.iter().map(cstring_ptr).collect();
    env_ptr.push(ptr::null());

    let cmd_cstring = os_to_cstring(cmd.as_ref())?;
    check_err(unsafe {
        libc::execve(cstring_ptr(&cmd_cstring), args_ptr.as_ptr(), env_ptr.as_ptr())
    })?;
    Ok(())
}

pub fn _exit(status: u8) -> ! {
    unsafe { libc::_exit(status as libc::c_int) }
}

pub const WNOHANG: i32 = libc::WNOHANG;
pub const WUNTRACED: i32 = libc::WUNTRACED;
pub const ECHILD: i32 = libc::ECHILD;

/// `waitpid(pid, flags)`. `pid < -1`, `-1`, `0`, `> 0` follow the usual
/// meanings; returns `Ok(None)` when `WNOHANG` was set and nothing was
/// ready, `Ok(Some(_))` otherwise.
pub fn waitpid(pid: i32, flags: i32) -> Result<Option<(i32, WaitStatus)>> {
    let mut status: libc::c_int = 0;
    let got = check_err(unsafe { libc::waitpid(pid, &mut status, flags) })?;
    if got == 0 {
        Ok(None)
    } else {
        Ok(Some((got, decode_status(status))))
    }
}

pub const SIGINT: i32 = libc::SIGINT;
pub const SIGQUIT: i32 = libc::SIGQUIT;
pub const SIGTERM: i32 = libc::SIGTERM;
pub const SIGKILL: i32 = libc::SIGKILL;
pub const SIGCONT: i32 = libc::SIGCONT;
pub const SIGSTOP: i32 = libc::SIGSTOP;
pub const SIGTSTP: i32 = libc::SIGTSTP;
pub const SIGTTIN: i32 = libc::SIGTTIN;
pub const SIGTTOU: i32 = libc::SIGTTOU;
pub const SIGHUP: i32 = libc::SIGHUP;
pub const SIGCHLD: i32 = libc::SIGCHLD;

pub fn kill(pid: i32, signal: i32) -> Result<()> {
    check_err(unsafe { libc::kill(pid, signal) })?;
    Ok(())
}

/// Signals an entire process group. A negative `pgid` argument to raw
/// `kill(2)` does this, but spelling it out here keeps call sites honest
/// about which one they mean.
pub fn killpg(pgid: i32, signal: i32) -> Result<()> {
    check_err(unsafe { libc::killpg(pgid, signal) })?;
    Ok(())
}

/// Installs `SIG_IGN` for `signum`, returning the previous disposition so
/// it can be restored later (used around terminal-ownership transfers,
/// where SIGTTIN/SIGTTOU must be masked only transiently).
pub fn signal_ignore(signum: i32) -> Result<libc::sighandler_t> {
    let prev = unsafe { libc::signal(signum, libc::SIG_IGN) };
    if prev == libc::SIG_ERR {
        return Err(Error::last_os_error());
    }
    Ok(prev)
}

/// Installs `SIG_DFL` for `signum`. Used on foreground children right
/// before `exec`, so they see ordinary job-control signal behavior
/// regardless of what the shell itself ignores.
pub fn signal_default(signum: i32) -> Result<()> {
    let prev = unsafe { libc::signal(signum, libc::SIG_DFL) };
    if prev == libc::SIG_ERR {
        return Err(Error::last_os_error());
    }
    Ok(())
}

pub fn signal_restore(signum: i32, disposition: libc::sighandler_t) -> Result<()> {
    let prev = unsafe { libc::signal(signum, disposition) };
    if prev == libc::SIG_ERR {
        return Err(Error::last_os_error());
    }
    Ok(())
}

static TERM_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn note_term_signal(_signum: libc::c_int) {
    TERM_REQUESTED.store(true, Ordering::SeqCst);
}

/// Installs the shell's SIGTERM handler: async-signal-safe, does nothing
/// but flip a flag. Real cleanup happens in ordinary control flow once
/// [`term_requested`] is observed to be true.
pub fn install_term_handler() -> Result<()> {
    let prev = unsafe { libc::signal(libc::SIGTERM, note_term_signal as libc::sighandler_t) };
    if prev == libc::SIG_ERR {
        return Err(Error::last_os_error());
    }
    Ok(())
}

pub fn term_requested() -> bool {
    TERM_REQUESTED.load(Ordering::SeqCst)
}

pub fn clear_term_requested() {
    TERM_REQUESTED.store(false, Ordering::SeqCst);
}

pub const O_RDONLY: i32 = libc::O_RDONLY;
pub const O_WRONLY: i32 = libc::O_WRONLY;
pub const O_CREAT: i32 = libc::O_CREAT;
pub const O_TRUNC: i32 = libc::O_TRUNC;
pub const O_APPEND: i32 = libc::O_APPEND;

/// Opens `path` with the given `flags`/creation `mode`, handing back the
/// raw fd (the caller owns it and is responsible for `dup2`'ing it into
/// place and closing it).
pub fn open(path: &CStr, flags: i32, mode: libc::mode_t) -> Result<i32> {
    check_err(unsafe { libc::open(path.as_ptr(), flags, mode) })
}

pub fn path_to_cstring(path: &str) -> Result<CString> {
    CString::new(path).map_err(|_| Error::from_raw_os_error(libc::EINVAL))
}

pub fn close(fd: i32) -> Result<()> {
    check_err(unsafe { libc::close(fd) })?;
    Ok(())
}

pub fn dup2(oldfd: i32, newfd: i32) -> Result<()> {
    check_err(unsafe { libc::dup2(oldfd, newfd) })?;
    Ok(())
}

/// The local host's name, as reported by `gethostname(2)`, used for the
/// shell prompt.
pub fn gethostname() -> Result<String> {
    let mut buf = [0u8; 256];
    check_err(unsafe {
        libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len())
    })?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// The calling user's home directory, from `getpwuid_r`, or `None` if the
/// passwd database has no entry for the current uid.
pub fn home_dir() -> Result<Option<String>> {
    let uid = unsafe { libc::getuid() };
    let mut pwd = MaybeUninit::<libc::passwd>::uninit();
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut result: *mut libc::passwd = ptr::null_mut();

    let rc = unsafe {
        libc::getpwuid_r(
            uid,
            pwd.as_mut_ptr(),
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        )
    };
    if rc != 0 {
        return Err(Error::from_raw_os_error(rc));
    }
    if result.is_null() {
        return Ok(None);
    }
    let pwd = unsafe { pwd.assume_init() };
    let dir = unsafe { CStr::from_ptr(pwd.pw_dir) };
    Ok(Some(dir.to_string_lossy().into_owned()))
}
