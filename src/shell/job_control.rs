use anyhow::{bail, Result};
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use crate::shell::executor::ExitStatus;

#[derive(Debug)]
pub struct Job {
    pid: Pid,
    command: String,
    start_time: Instant,
}

/// A background job observed as finished by `reap`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedJob {
    pub pid: Pid,
    pub status: ExitStatus,
}

impl fmt::Display for CompletedJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "background pid {} is done: {}", self.pid, self.status)
    }
}

/// Background processes the shell still owes a `waitpid`.
pub struct JobControl {
    jobs: BTreeMap<Pid, Job>,
    capacity: usize,
}

impl JobControl {
    pub fn new(capacity: usize) -> Self {
        JobControl {
            jobs: BTreeMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.jobs.contains_key(&pid)
    }

    pub fn add(&mut self, pid: Pid, command: &str) -> Result<()> {
        if self.contains(pid) {
            bail!("background pid {} is already tracked", pid);
        }
        if self.jobs.len() >= self.capacity {
            bail!("too many background processes (limit is {})", self.capacity);
        }

        debug!("Tracking background pid {}: {}", pid, command);
        self.jobs.insert(
            pid,
            Job {
                pid,
                command: command.to_string(),
                start_time: Instant::now(),
            },
        );
        Ok(())
    }

    /// Polls every tracked pid without blocking and forgets the ones that finished.
    pub fn reap(&mut self) -> Vec<CompletedJob> {
        let mut completed = Vec::new();

        self.jobs.retain(|&pid, job| {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(_, code)) => {
                    completed.push(CompletedJob {
                        pid,
                        status: ExitStatus::Exited(code),
                    });
                }
                Ok(WaitStatus::Signaled(_, sig, _)) => {
                    completed.push(CompletedJob {
                        pid,
                        status: ExitStatus::Signaled(sig as i32),
                    });
                }
                Ok(_) => return true,
                Err(Errno::EINTR) => return true,
                Err(e) => {
                    warn!("Dropping background pid {}: waitpid failed: {}", pid, e);
                    return false;
                }
            }
            debug!(
                "Reaped background pid {} ({}) after {:?}",
                job.pid,
                job.command,
                job.start_time.elapsed()
            );
            false
        });

        completed
    }

    /// Terminates and waits for `foreground` (if any) and every tracked job.
    /// Returns 1 if any process needed SIGKILL, 0 otherwise.
    pub fn terminate_all(&mut self, foreground: Option<Pid>) -> i32 {
        let mut exit_status = 0;

        let pids = foreground
            .into_iter()
            .chain(std::mem::take(&mut self.jobs).into_keys());

        for pid in pids {
            if !terminate(pid) {
                exit_status = 1;
            }
        }

        exit_status
    }
}

/// SIGTERM, falling back to SIGKILL, then a blocking wait so nothing is left as a zombie.
/// Returns false when the fallback was needed.
fn terminate(pid: Pid) -> bool {
    let graceful = match signal::kill(pid, Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            warn!("SIGTERM to pid {} failed ({}), sending SIGKILL", pid, e);
            let _ = signal::kill(pid, Signal::SIGKILL);
            false
        }
    };

    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            Err(e) => {
                debug!("waitpid({}) during shutdown: {}", pid, e);
                break;
            }
            Ok(status) => {
                debug!("Shutdown reaped pid {}: {:?}", pid, status);
                break;
            }
        }
    }

    graceful
}
