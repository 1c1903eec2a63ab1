// src/shell/command_parser.rs
use anyhow::{bail, Result};

/// One command line, ready for execution. `args[0]` is always the command name.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub background: bool,
}

pub struct CommandParser {
    max_args: usize,
}

impl CommandParser {
    pub fn new(max_args: usize) -> Self {
        CommandParser { max_args }
    }

    /// Returns `Ok(None)` for blank lines and `#` comments.
    pub fn parse(&self, line: &str) -> Result<Option<Command>> {
        if line.starts_with('#') {
            return Ok(None);
        }

        let mut tokens = line.split_whitespace();
        let name = match tokens.next() {
            Some(token) => token.to_string(),
            None => return Ok(None),
        };

        let mut args = vec![name.clone()];
        let mut input_path = None;
        let mut output_path = None;

        while let Some(token) = tokens.next() {
            match token {
                "<" => {
                    if let Some(path) = tokens.next() {
                        input_path = Some(path.to_string());
                    }
                }
                ">" => {
                    if let Some(path) = tokens.next() {
                        output_path = Some(path.to_string());
                    }
                }
                _ => args.push(token.to_string()),
            }
        }

        // `&` only counts as the very last argument; anywhere else it is passed through
        let background = args.len() > 1 && args.last().map(String::as_str) == Some("&");
        if background {
            args.pop();
        }

        if args.len() > self.max_args {
            bail!("too many arguments ({} given, limit is {})", args.len(), self.max_args);
        }

        Ok(Some(Command {
            name,
            args,
            input_path,
            output_path,
            background,
        }))
    }
}
