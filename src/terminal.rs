//! Controlling-terminal ownership transfer.
//!
//! Giving a process group the terminal requires briefly ignoring
//! SIGTTOU and SIGTTIN: `tcsetpgrp` sends SIGTTOU to the calling process
//! if the calling process is itself not in the terminal's foreground
//! group, and a shell reading from the terminal while backgrounded would
//! otherwise be stopped by SIGTTIN — both exactly the situation the
//! shell is in every time it hands off to a job or takes the terminal
//! back.

use std::io::Result;

use crate::posix;

/// Makes `pgid` the terminal's foreground process group, ignoring
/// SIGTTOU and SIGTTIN around the call and restoring their previous
/// dispositions afterward.
pub fn set_foreground(tty_fd: i32, pgid: i32) -> Result<()> {
    let prev_ttou = posix::signal_ignore(posix::SIGTTOU)?;
    let prev_ttin = posix::signal_ignore(posix::SIGTTIN)?;
    let result = posix::tcsetpgrp(tty_fd, pgid);
    posix::signal_restore(posix::SIGTTIN, prev_ttin)?;
    posix::signal_restore(posix::SIGTTOU, prev_ttou)?;
    result
}

pub fn foreground_pgid(tty_fd: i32) -> Result<i32> {
    posix::tcgetpgrp(tty_fd)
}
