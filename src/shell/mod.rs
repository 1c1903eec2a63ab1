mod command_parser;
mod executor;
mod job_control;
mod pid_expansion;
mod redirection;
mod signal_handler;

use anyhow::{anyhow, Result};
use log::debug;
use nix::unistd::{self, Pid};
use std::env;
use std::io::Write;

use crate::config::Config;
use crate::shell::command_parser::{Command, CommandParser};
use crate::shell::executor::{ExitStatus, Executor, Outcome};
use crate::shell::job_control::JobControl;
use crate::shell::signal_handler::{ShellMode, SignalHandler};
use crate::terminal::{Input, Terminal};

/// Everything the running shell knows about its children.
pub struct Session {
    pub mode: ShellMode,
    pub jobs: JobControl,
    /// Set only while `Executor` blocks on a foreground child.
    pub foreground: Option<Pid>,
    pub last_status: ExitStatus,
    pub shell_pid: Pid,
}

impl Session {
    pub fn new(max_background_jobs: usize) -> Self {
        Session {
            mode: ShellMode::new(),
            jobs: JobControl::new(max_background_jobs),
            foreground: None,
            last_status: ExitStatus::default(),
            shell_pid: unistd::getpid(),
        }
    }

    /// Applies any SIGTSTP toggles received so far and prints their notices.
    pub fn announce_mode_changes(&mut self) {
        for notice in self.mode.apply_pending() {
            println!("{}", notice);
        }
        flush_stdout();
    }

    pub fn reap(&mut self) {
        for done in self.jobs.reap() {
            println!("{}", done);
        }
        flush_stdout();
    }

    /// Kills the tracked foreground child and every background job.
    pub fn shutdown(&mut self) -> i32 {
        let foreground = self.foreground.take();
        if foreground.is_none() && self.jobs.is_empty() {
            debug!("Shutting down with no children to terminate");
            return 0;
        }
        debug!(
            "Shutting down: foreground {:?}, {} background job(s)",
            foreground,
            self.jobs.len()
        );
        self.jobs.terminate_all(foreground)
    }
}

enum Builtin {
    Exit,
    Cd,
    Status,
}

impl Builtin {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "exit" => Some(Builtin::Exit),
            "cd" => Some(Builtin::Cd),
            "status" => Some(Builtin::Status),
            _ => None,
        }
    }
}

pub struct Shell {
    terminal: Terminal,
    parser: CommandParser,
    session: Session,
}

impl Shell {
    pub fn new(config: &Config) -> Self {
        if let Err(e) = SignalHandler::initialize() {
            eprintln!("smallsh: failed to install signal handlers: {}", e);
        }

        Shell {
            terminal: Terminal::new(&config.prompt, config.max_line_length),
            parser: CommandParser::new(config.max_args),
            session: Session::new(config.max_background_jobs),
        }
    }

    /// Runs until `exit` or end of input and returns the process exit code.
    pub fn run(&mut self) -> Result<i32> {
        let mut show_prompt = true;

        loop {
            self.session.announce_mode_changes();
            if show_prompt {
                self.terminal.show_prompt()?;
            }
            show_prompt = true;

            let line = match self.terminal.read_line() {
                Ok(Input::Line(line)) => line,
                Ok(Input::TooLong(len)) => {
                    eprintln!(
                        "smallsh: input line too long ({} bytes), ignored",
                        len
                    );
                    self.session.reap();
                    continue;
                }
                Ok(Input::Interrupted) => {
                    // the notice lands on the prompt's line otherwise
                    if SignalHandler::has_pending_toggles() {
                        println!();
                    } else {
                        show_prompt = false;
                    }
                    continue;
                }
                Ok(Input::Eof) => {
                    debug!("End of input");
                    break;
                }
                Err(e) => {
                    eprintln!("smallsh: {:#}", e);
                    break;
                }
            };

            let mut cmd = match self.parser.parse(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => {
                    self.session.reap();
                    continue;
                }
                Err(e) => {
                    eprintln!("smallsh: {:#}", e);
                    self.session.reap();
                    continue;
                }
            };

            pid_expansion::expand_command(&mut cmd, self.session.shell_pid.as_raw() as u32);

            match Builtin::lookup(&cmd.name) {
                Some(Builtin::Exit) => return Ok(self.session.shutdown()),
                Some(Builtin::Cd) => {
                    if let Err(e) = change_directory(&cmd) {
                        eprintln!("smallsh: {:#}", e);
                    }
                }
                Some(Builtin::Status) => {
                    println!("{}", self.session.last_status);
                }
                None => match Executor::execute(&mut self.session, &cmd) {
                    Outcome::Foreground(status) => self.session.last_status = status,
                    Outcome::Background(pid) => debug!("Started background pid {}", pid),
                },
            }

            self.session.reap();
        }

        Ok(self.session.shutdown())
    }
}

/// Output written before a fork or a blocking wait must reach the terminal first.
pub fn flush_stdout() {
    if let Err(e) = std::io::stdout().flush() {
        debug!("Failed to flush stdout: {}", e);
    }
}

fn change_directory(cmd: &Command) -> Result<()> {
    let target = match cmd.args.get(1) {
        Some(path) => path.clone(),
        None => env::var("HOME").map_err(|_| anyhow!("cd: HOME is not set"))?,
    };

    env::set_current_dir(&target).map_err(|e| anyhow!("cd: {}: {}", target, e))?;
    debug!("Changed directory to {}", target);
    Ok(())
}
