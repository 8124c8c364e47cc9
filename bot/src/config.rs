use std::env;
use std::path::PathBuf;

/// Runtime configuration, read from the environment after dotenv. The bot
/// token itself is consumed by `Bot::from_env`.
pub struct Config {
    pub blacklist_file: PathBuf,
    pub warn_limit: u32,
    pub health_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            blacklist_file: env::var("BLACKLIST_FILE")
                .unwrap_or_else(|_| "blacklist.json".to_string())
                .into(),
            warn_limit: env::var("WARN_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            health_port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
        }
    }
}
