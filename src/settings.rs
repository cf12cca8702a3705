use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::project::{read_json, write_json, ProjectError};
use crate::value::NullPolicy;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8765;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

const SETTINGS_VERSION: u32 = 1;

/// Server settings stored in the OS config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeSettings {
    pub version: u32,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Host loop frame length.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How long a caller waits for a command result.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Project opened at startup. None = the working directory.
    #[serde(default)]
    pub project_dir: Option<PathBuf>,
    #[serde(default)]
    pub null_policy: NullPolicy,
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_call_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            bind_address: default_bind_address(),
            port: DEFAULT_PORT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            project_dir: None,
            null_policy: NullPolicy::default(),
        }
    }
}

impl BridgeSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind_address, self.port).parse()
    }
}

/// Load settings from the app config directory. Returns None if no settings
/// file exists or it cannot be parsed.
pub fn load_settings(app_config_dir: &Path) -> Option<BridgeSettings> {
    let path = crate::paths::settings_path(app_config_dir);
    if !path.exists() {
        return None;
    }
    match read_json::<BridgeSettings>(&path) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
            None
        }
    }
}

/// Save settings to the app config directory.
pub fn save_settings(
    app_config_dir: &Path,
    settings: &BridgeSettings,
) -> Result<(), ProjectError> {
    std::fs::create_dir_all(app_config_dir)?;
    write_json(&crate::paths::settings_path(app_config_dir), settings)
}
