// src/shell/redirection.rs
use anyhow::{Context, Result};
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};
use std::os::unix::io::RawFd;

use crate::shell::command_parser::Command;

pub const NULL_DEVICE: &str = "/dev/null";

/// Where a child's standard stream ends up before exec.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Inherit,
    File(String),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedirectionPlan {
    pub stdin: Binding,
    pub stdout: Binding,
}

impl RedirectionPlan {
    /// Explicit paths win; background jobs get the null device for anything left unbound.
    pub fn for_command(cmd: &Command, background: bool) -> Self {
        let bind = |path: &Option<String>| match path {
            Some(path) => Binding::File(path.clone()),
            None if background => Binding::Null,
            None => Binding::Inherit,
        };

        RedirectionPlan {
            stdin: bind(&cmd.input_path),
            stdout: bind(&cmd.output_path),
        }
    }

    pub fn touches_std_streams(&self) -> bool {
        self.stdin != Binding::Inherit || self.stdout != Binding::Inherit
    }

    /// Rebinds fd 0 and fd 1 of the calling process. Only meant for a freshly forked child.
    pub fn apply(&self) -> Result<()> {
        match &self.stdin {
            Binding::Inherit => {}
            Binding::File(path) => {
                let fd = open_input(path)
                    .with_context(|| format!("cannot open {} for input", path))?;
                rebind(fd, libc::STDIN_FILENO).context("dup2 stdin")?;
            }
            Binding::Null => {
                let fd = open_input(NULL_DEVICE)
                    .with_context(|| format!("cannot open {} for input", NULL_DEVICE))?;
                rebind(fd, libc::STDIN_FILENO).context("dup2 stdin")?;
            }
        }

        match &self.stdout {
            Binding::Inherit => {}
            Binding::File(path) => {
                let fd = open_output(path)
                    .with_context(|| format!("cannot open {} for output", path))?;
                rebind(fd, libc::STDOUT_FILENO).context("dup2 stdout")?;
            }
            Binding::Null => {
                let fd = open_null_output()
                    .with_context(|| format!("cannot open {} for output", NULL_DEVICE))?;
                rebind(fd, libc::STDOUT_FILENO).context("dup2 stdout")?;
            }
        }

        Ok(())
    }
}

pub fn open_input(path: &str) -> nix::Result<RawFd> {
    open(path, OFlag::O_RDONLY, Mode::empty())
}

/// Write-only, created if absent, truncated if present, mode 0644.
pub fn open_output(path: &str) -> nix::Result<RawFd> {
    open(
        path,
        OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH,
    )
}

fn open_null_output() -> nix::Result<RawFd> {
    open(NULL_DEVICE, OFlag::O_WRONLY, Mode::empty())
}

fn rebind(fd: RawFd, target: RawFd) -> nix::Result<()> {
    if fd == target {
        return Ok(());
    }
    dup2(fd, target)?;
    close(fd)
}
