use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_PORT: u16 = 4310;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/// Server configuration.
///
/// Priority (highest to lowest):
///   1. CLI / env — passed as `Some(value)` from clap
///   2. TOML file at `{data_dir}/config.toml`
///   3. Built-in defaults
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP API port.
    pub port: u16,
    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access).
    pub bind_address: String,
    /// Data directory holding the SQLite database and config.toml.
    pub data_dir: PathBuf,
    /// Log level filter (trace, debug, info, warn, error).
    pub log: String,
    /// Log format: "pretty" (compact human-readable) or "json".
    pub log_format: String,
    /// Slow-query logging threshold in milliseconds. 0 disables it.
    pub slow_query_ms: u64,
}

/// `config.toml` mirror of [`ServerConfig`] — every field optional so the
/// file can set only what it cares about.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    port: Option<u16>,
    bind_address: Option<String>,
    log: Option<String>,
    log_format: Option<String>,
    slow_query_ms: Option<u64>,
}

impl ServerConfig {
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(std::env::var("TASKD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("TASKD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let slow_query_ms = toml.slow_query_ms.unwrap_or(0);

        Self {
            port,
            bind_address,
            data_dir,
            log,
            log_format,
            slow_query_ms,
        }
    }
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let raw = std::fs::read_to_string(&path).ok()?;
    match toml::from_str(&raw) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!(path = %path.display(), err = %e, "ignoring malformed config.toml");
            None
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/taskd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("taskd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/taskd or ~/.local/share/taskd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("taskd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("taskd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\taskd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("taskd");
        }
    }
    // Fallback
    PathBuf::from(".taskd")
}
