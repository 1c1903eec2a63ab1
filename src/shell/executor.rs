// src/shell/executor.rs
use anyhow::{Context, Result};
use log::{debug, error};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, ForkResult, Pid};
use std::ffi::CString;
use std::fmt;

use crate::shell::command_parser::Command;
use crate::shell::redirection::RedirectionPlan;
use crate::shell::signal_handler::SignalHandler;
use crate::shell::{flush_stdout, Session};

/// How a foreground command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(i32),
}

impl Default for ExitStatus {
    fn default() -> Self {
        ExitStatus::Exited(0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit value {}", code),
            ExitStatus::Signaled(sig) => write!(f, "terminated by signal {}", sig),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Foreground(ExitStatus),
    Background(Pid),
}

pub struct Executor;

impl Executor {
    pub fn execute(session: &mut Session, cmd: &Command) -> Outcome {
        if cmd.background && session.mode.is_foreground_only() {
            debug!("Foreground-only mode, running {} in the foreground", cmd.name);
        }
        let background = cmd.background && session.mode.allows_background();

        let argv = match Self::build_argv(cmd) {
            Ok(argv) => argv,
            Err(e) => {
                eprintln!("smallsh: {:#}", e);
                return Outcome::Foreground(ExitStatus::Exited(1));
            }
        };
        let plan = RedirectionPlan::for_command(cmd, background);
        debug!(
            "Forking {} (background: {}, redirected: {})",
            cmd.name,
            background,
            plan.touches_std_streams()
        );

        // the child inherits anything still sitting in our stdout buffer
        flush_stdout();

        match unsafe { fork() } {
            Err(e) => {
                eprintln!("smallsh: fork failed: {}", e);
                Outcome::Foreground(ExitStatus::Exited(1))
            }
            Ok(ForkResult::Child) => Self::run_child(&argv, &plan, background),
            Ok(ForkResult::Parent { child }) => {
                if background {
                    Self::track_background(session, child, cmd)
                } else {
                    Outcome::Foreground(Self::wait_foreground(session, child))
                }
            }
        }
    }

    fn build_argv(cmd: &Command) -> Result<Vec<CString>> {
        cmd.args
            .iter()
            .map(|arg| {
                CString::new(arg.as_bytes())
                    .with_context(|| format!("{}: argument contains a NUL byte", cmd.name))
            })
            .collect()
    }

    fn run_child(argv: &[CString], plan: &RedirectionPlan, background: bool) -> ! {
        if let Err(e) = plan.apply() {
            eprintln!("smallsh: {:#}", e);
            exit_child(1);
        }

        if let Err(e) = SignalHandler::configure_child(background) {
            eprintln!("smallsh: sigaction: {}", e);
            exit_child(1);
        }

        let program = &argv[0];
        let Err(e) = execvp(program, argv);
        eprintln!("smallsh: {}: {}", program.to_string_lossy(), e.desc());
        exit_child(1)
    }

    fn track_background(session: &mut Session, child: Pid, cmd: &Command) -> Outcome {
        println!("background pid is {}", child);
        flush_stdout();

        if let Err(e) = session.jobs.add(child, &cmd.args.join(" ")) {
            eprintln!("smallsh: {:#}", e);
        }
        Outcome::Background(child)
    }

    fn wait_foreground(session: &mut Session, child: Pid) -> ExitStatus {
        session.foreground = Some(child);
        debug!("Waiting for foreground pid {}", child);

        let status = loop {
            match waitpid(child, None) {
                Ok(WaitStatus::Exited(_, code)) => break ExitStatus::Exited(code),
                Ok(WaitStatus::Signaled(_, sig, _)) => {
                    eprintln!("terminated by signal {}", sig as i32);
                    break ExitStatus::Signaled(sig as i32);
                }
                Ok(other) => debug!("Ignoring wait status {:?}", other),
                Err(Errno::EINTR) => session.announce_mode_changes(),
                Err(e) => {
                    error!("waitpid({}) failed: {}", child, e);
                    eprintln!("smallsh: waitpid: {}", e);
                    break ExitStatus::Exited(1);
                }
            }
        };

        session.foreground = None;
        status
    }
}

fn exit_child(code: i32) -> ! {
    // skip atexit handlers and stdio flushing that belong to the parent
    unsafe { libc::_exit(code) }
}
