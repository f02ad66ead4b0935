use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ask_engine::{AnswerSettings, ClientSettings};
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

use super::logging::LogDestination;

pub(crate) const DEFAULT_CONFIG_PATH: &str = "./ask.ron";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// On-disk shape; every field may be omitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct FileConfig {
    base_url: String,
    connect_timeout_ms: u64,
    request_timeout_ms: u64,
    idle_timeout_ms: u64,
    max_answer_bytes: u64,
    log_level: String,
    log_destination: LogDestination,
}

impl Default for FileConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            base_url: client.base_url,
            connect_timeout_ms: millis(client.connect_timeout),
            request_timeout_ms: millis(client.request_timeout),
            idle_timeout_ms: millis(client.answer.idle_timeout),
            max_answer_bytes: client.answer.max_answer_bytes,
            log_level: "info".to_string(),
            log_destination: LogDestination::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AppConfig {
    pub(crate) client: ClientSettings,
    pub(crate) log_level: LevelFilter,
    pub(crate) log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client: ClientSettings::default(),
            log_level: LevelFilter::Info,
            log_destination: LogDestination::default(),
        }
    }
}

/// Loads the config at `path`; a missing file yields the defaults.
pub(crate) fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse(&content).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn parse(content: &str) -> Result<AppConfig, String> {
    let file: FileConfig = ron::from_str(content).map_err(|err| err.to_string())?;
    let log_level = ask_logging::level_from_name(&file.log_level)
        .ok_or_else(|| format!("unknown log level {:?}", file.log_level))?;

    if file.max_answer_bytes == 0 {
        return Err("max_answer_bytes must be greater than zero".to_string());
    }

    Ok(AppConfig {
        client: ClientSettings {
            base_url: file.base_url,
            connect_timeout: nonzero_millis("connect_timeout_ms", file.connect_timeout_ms)?,
            request_timeout: nonzero_millis("request_timeout_ms", file.request_timeout_ms)?,
            answer: AnswerSettings {
                idle_timeout: nonzero_millis("idle_timeout_ms", file.idle_timeout_ms)?,
                max_answer_bytes: file.max_answer_bytes,
            },
        },
        log_level,
        log_destination: file.log_destination,
    })
}

// A zero timeout would fail every request before it starts.
fn nonzero_millis(field: &str, value: u64) -> Result<Duration, String> {
    if value == 0 {
        return Err(format!("{field} must be greater than zero"));
    }
    Ok(Duration::from_millis(value))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use log::LevelFilter;
    use tempfile::TempDir;

    use super::{load, ConfigError, LogDestination};

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load(&temp.path().join("absent.ron")).unwrap();
        assert_eq!(config.client.base_url, "http://localhost:3000");
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.log_destination, LogDestination::File);
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ask.ron");
        fs::write(
            &path,
            r#"(base_url: "http://qa.internal:8080", idle_timeout_ms: 1500, log_level: "debug", log_destination: Both)"#,
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.client.base_url, "http://qa.internal:8080");
        assert_eq!(config.client.answer.idle_timeout, Duration::from_millis(1500));
        assert_eq!(config.client.request_timeout, Duration::from_secs(30));
        assert_eq!(config.client.answer.max_answer_bytes, 1024 * 1024);
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.log_destination, LogDestination::Both);
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ask.ron");
        fs::write(&path, "(base_url: 12").unwrap();

        assert!(matches!(load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ask.ron");
        fs::write(&path, r#"(log_level: "chatty")"#).unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("chatty"));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ask.ron");

        fs::write(&path, "(idle_timeout_ms: 0)").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("idle_timeout_ms"));

        fs::write(&path, "(request_timeout_ms: 0)").unwrap();
        assert!(load(&path)
            .unwrap_err()
            .to_string()
            .contains("request_timeout_ms"));

        fs::write(&path, "(max_answer_bytes: 0)").unwrap();
        assert!(load(&path)
            .unwrap_err()
            .to_string()
            .contains("max_answer_bytes"));
    }
}
