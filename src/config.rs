//! Runtime configuration from `FEEDBOARD_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Settings that are not part of the database itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `tracing` filter directive.
    pub log_filter: String,
    /// Directory for the log file (None = logging disabled).
    pub log_dir: Option<PathBuf>,
    /// Per-request HTTP timeout (None = wait indefinitely).
    pub http_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            log_dir: default_log_dir(),
            http_timeout: None,
            user_agent: concat!("feedboard/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load config from environment variables (and `.env`, if present).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(filter) = dotenvy::var("FEEDBOARD_LOG").or_else(|_| dotenvy::var("RUST_LOG")) {
            cfg.log_filter = filter;
        }

        if let Ok(dir) = dotenvy::var("FEEDBOARD_LOG_DIR") {
            cfg.log_dir = Some(PathBuf::from(dir));
        }

        if let Ok(val) = dotenvy::var("FEEDBOARD_HTTP_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            cfg.http_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Ok(agent) = dotenvy::var("FEEDBOARD_USER_AGENT")
            && !agent.trim().is_empty()
        {
            cfg.user_agent = agent;
        }

        cfg
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| dir.join(LOG_FILE_NAME))
    }
}

pub const LOG_FILE_NAME: &str = "feedboard.log";

fn default_log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "feedboard", "feedboard")
        .map(|dirs| dirs.data_dir().join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_requests_unbounded() {
        let cfg = Config::default();
        assert_eq!(cfg.http_timeout, None);
        assert_eq!(cfg.log_filter, "info");
        assert!(cfg.user_agent.starts_with("feedboard/"));
    }

    #[test]
    fn log_file_lives_in_log_dir() {
        let cfg = Config {
            log_dir: Some(PathBuf::from("/tmp/fb")),
            ..Config::default()
        };
        assert_eq!(cfg.log_file(), Some(PathBuf::from("/tmp/fb/feedboard.log")));
    }
}
