//! A single job: one command chain, running as one or more processes
//! sharing a process group.

use crate::posix::WaitStatus;

/// The reporting state of one process belonging to a job.
#[derive(Debug, Clone, Copy)]
pub struct ProcessStatus {
    pub pid: i32,
    /// `None` until a `waitpid` call reports this process; `Some` holds
    /// the last decoded status seen for it.
    pub status: Option<WaitStatus>,
}

impl ProcessStatus {
    pub fn new(pid: i32) -> ProcessStatus {
        ProcessStatus { pid, status: None }
    }

    pub fn is_done(&self) -> bool {
        matches!(
            self.status,
            Some(WaitStatus::Exited(_)) | Some(WaitStatus::Signaled(_))
        )
    }
}

/// A running or recently-finished job, as listed by `jobs` and addressed
/// by `fg`/`bg`/`kill %n`.
#[derive(Debug, Clone)]
pub struct Job {
    /// The process group id shared by every process in the job; also the
    /// pid of the first process, per POSIX process-group convention.
    pub pgid: i32,
    pub procs: Vec<ProcessStatus>,
    /// Rendering of the command chain that produced this job, for `jobs`.
    pub cmd: String,
    /// Was this job started with `&`.
    pub background: bool,
}

/// Coarse-grained status a job can be reported under, per the
/// classification priority: exited-all beats killed, killed beats
/// merely-terminated, and a stopped process (while others may still be
/// running) reports the whole job stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
    Done,
    /// Every process exited or was signaled, and at least one was
    /// signaled by something other than SIGTERM.
    Killed,
    /// Every process exited or was signaled, and the only signal seen
    /// was SIGTERM (the signal `kill %N` and shutdown cleanup send).
    Terminated,
}

impl Job {
    pub fn new(pgid: i32, cmd: String, background: bool) -> Job {
        Job {
            pgid,
            procs: Vec::new(),
            cmd,
            background,
        }
    }

    pub fn all_done(&self) -> bool {
        self.procs.iter().all(ProcessStatus::is_done)
    }

    pub fn any_stopped(&self) -> bool {
        self.procs
            .iter()
            .any(|p| matches!(p.status, Some(WaitStatus::Stopped(_))))
    }

    /// Classifies the job's overall status from its processes' recorded
    /// statuses, per the fixed priority exited-all > killed > terminated.
    /// A process signaled by anything other than SIGTERM counts as
    /// killed; SIGTERM alone (no other signal present) counts as merely
    /// terminated, since that's the signal `kill %N`/shutdown cleanup
    /// itself sends.
    pub fn classify(&self) -> JobStatus {
        if self.all_done() {
            let any_killed = self.procs.iter().any(|p| {
                matches!(p.status, Some(WaitStatus::Signaled(sig)) if sig != crate::posix::SIGTERM)
            });
            if any_killed {
                JobStatus::Killed
            } else if self
                .procs
                .iter()
                .any(|p| matches!(p.status, Some(WaitStatus::Signaled(_))))
            {
                JobStatus::Terminated
            } else {
                JobStatus::Done
            }
        } else if self.any_stopped() {
            JobStatus::Stopped
        } else {
            JobStatus::Running
        }
    }
}

impl JobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Running => "Running",
            JobStatus::Stopped => "Stopped",
            JobStatus::Done => "Done",
            JobStatus::Killed => "Killed",
            JobStatus::Terminated => "Terminated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(pid: i32, code: i32) -> ProcessStatus {
        ProcessStatus {
            pid,
            status: Some(WaitStatus::Exited(code)),
        }
    }

    fn signaled(pid: i32, sig: i32) -> ProcessStatus {
        ProcessStatus {
            pid,
            status: Some(WaitStatus::Signaled(sig)),
        }
    }

    fn running(pid: i32) -> ProcessStatus {
        ProcessStatus { pid, status: None }
    }

    fn stopped(pid: i32) -> ProcessStatus {
        ProcessStatus {
            pid,
            status: Some(WaitStatus::Stopped(crate::posix::SIGTSTP)),
        }
    }

    #[test]
    fn all_exited_is_done() {
        let mut j = Job::new(1, "echo hi".into(), false);
        j.procs.push(exited(1, 0));
        assert_eq!(j.classify(), JobStatus::Done);
    }

    #[test]
    fn any_running_is_running() {
        let mut j = Job::new(1, "sleep 10".into(), true);
        j.procs.push(running(1));
        assert_eq!(j.classify(), JobStatus::Running);
    }

    #[test]
    fn any_stopped_overrides_running() {
        let mut j = Job::new(1, "vi".into(), false);
        j.procs.push(stopped(1));
        j.procs.push(running(2));
        assert_eq!(j.classify(), JobStatus::Stopped);
    }

    #[test]
    fn killed_beats_terminated_when_all_done() {
        let mut j = Job::new(1, "a | b".into(), false);
        j.procs.push(signaled(1, crate::posix::SIGKILL));
        j.procs.push(exited(2, 0));
        assert_eq!(j.classify(), JobStatus::Killed);
    }

    #[test]
    fn sigterm_only_is_terminated() {
        let mut j = Job::new(1, "a".into(), false);
        j.procs.push(signaled(1, crate::posix::SIGTERM));
        assert_eq!(j.classify(), JobStatus::Terminated);
    }

    #[test]
    fn non_sigterm_signal_is_killed() {
        let mut j = Job::new(1, "a".into(), false);
        j.procs.push(signaled(1, crate::posix::SIGINT));
        assert_eq!(j.classify(), JobStatus::Killed);
    }
}
