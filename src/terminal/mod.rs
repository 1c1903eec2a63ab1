use anyhow::{Context, Result};
use log::debug;
use nix::errno::Errno;
use nix::unistd::read;
use std::io::Write;

const READ_CHUNK: usize = 1024;

#[derive(Debug, PartialEq)]
pub enum Input {
    Line(String),
    /// The line exceeded the configured maximum and was discarded.
    TooLong(usize),
    /// A signal arrived before a full line was read.
    Interrupted,
    Eof,
}

/// Line reader over fd 0 that hands `EINTR` back to the caller instead of retrying,
/// so mode notices are not held back until the next newline.
pub struct Terminal {
    prompt: String,
    max_line_length: usize,
    fd: i32,
    pending: Vec<u8>,
    /// Bytes already dropped from an overlong line still waiting for its newline.
    discarded: usize,
}

impl Terminal {
    pub fn new(prompt: &str, max_line_length: usize) -> Self {
        Self::with_fd(libc::STDIN_FILENO, prompt, max_line_length)
    }

    pub fn with_fd(fd: i32, prompt: &str, max_line_length: usize) -> Self {
        Terminal {
            prompt: prompt.to_string(),
            max_line_length,
            fd,
            pending: Vec::new(),
            discarded: 0,
        }
    }

    pub fn show_prompt(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", self.prompt)?;
        stdout.flush().context("Failed to flush prompt")
    }

    pub fn read_line(&mut self) -> Result<Input> {
        loop {
            if let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = self.pending.drain(..=newline).collect();
                return Ok(self.finish_line(&raw[..raw.len() - 1]));
            }

            if self.pending.len() > self.max_line_length {
                self.discarded += self.pending.len();
                self.pending.clear();
            }

            let mut chunk = [0u8; READ_CHUNK];
            match read(self.fd, &mut chunk) {
                Ok(0) => {
                    if self.pending.is_empty() && self.discarded == 0 {
                        return Ok(Input::Eof);
                    }
                    // last line without a trailing newline
                    let raw = std::mem::take(&mut self.pending);
                    return Ok(self.finish_line(&raw));
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(Errno::EINTR) => return Ok(Input::Interrupted),
                Err(e) => return Err(e).context("read from standard input"),
            }
        }
    }

    fn finish_line(&mut self, raw: &[u8]) -> Input {
        let len = std::mem::take(&mut self.discarded) + raw.len();
        if len > self.max_line_length {
            debug!("Discarding {} byte input line", len);
            return Input::TooLong(len);
        }
        Input::Line(String::from_utf8_lossy(raw).into_owned())
    }
}
