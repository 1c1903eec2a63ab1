mod config;
mod shell;
mod terminal;

use crate::config::CONFIG;
use crate::shell::Shell;
use anyhow::Result;
use std::io::Write;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    dotenv::dotenv().ok();

    let mut shell = Shell::new(&CONFIG);
    let exit_code = shell.run()?;

    std::io::stdout().flush()?;
    std::process::exit(exit_code);
}
