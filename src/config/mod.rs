use lazy_static::lazy_static;
use log::warn;
use std::env;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Config {
    pub prompt: String,
    pub max_line_length: usize,
    pub max_args: usize,
    pub max_background_jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prompt: ":".to_string(),
            max_line_length: 2048,
            max_args: 512,
            max_background_jobs: 512,
        }
    }
}

impl Config {
    /// Builds the configuration from `SMALLSH_*` environment variables,
    /// keeping the default for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            prompt: env::var("SMALLSH_PROMPT").unwrap_or(defaults.prompt),
            max_line_length: read_usize("SMALLSH_MAX_LINE", defaults.max_line_length),
            max_args: read_usize("SMALLSH_MAX_ARGS", defaults.max_args),
            max_background_jobs: read_usize("SMALLSH_MAX_JOBS", defaults.max_background_jobs),
        }
    }
}

fn read_usize(key: &str, default: usize) -> usize {
    match env::var(key) {
        Ok(value) => match value.trim().parse::<usize>() {
            Ok(parsed) if parsed > 0 => parsed,
            _ => {
                warn!("Ignoring invalid {}={:?}, using {}", key, value, default);
                default
            }
        },
        Err(_) => default,
    }
}

lazy_static! {
    pub static ref CONFIG: Arc<Config> = Arc::new(Config::from_env());
}
