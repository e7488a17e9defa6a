use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub github_api_url: String,
    /// Cached sessions unused for this long are dropped from memory.
    pub session_idle: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let port = match env::var("PORT") {
            Ok(value) => value.parse::<u16>().unwrap_or_else(|_| {
                warn!("ignoring invalid PORT value {value:?}");
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        let session_idle = match env::var("SESSION_IDLE_SECS") {
            Ok(value) => value.parse::<u64>().unwrap_or_else(|_| {
                warn!("ignoring invalid SESSION_IDLE_SECS value {value:?}");
                DEFAULT_SESSION_IDLE_SECS
            }),
            Err(_) => DEFAULT_SESSION_IDLE_SECS,
        };

        Self {
            port,
            data_dir: env::var("APP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| DEFAULT_GITHUB_API.to_string()),
            session_idle: Duration::from_secs(session_idle),
        }
    }

    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join("records.json")
    }

    pub fn guests_dir(&self) -> PathBuf {
        self.data_dir.join("guests")
    }
}
