//! Configuration – reads/writes `~/.gasp/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted settings stored in `~/.gasp/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// `<host>:<port>` the server listens on.
    #[serde(default = "default_socket")]
    pub socket: String,

    /// Path the demo form is served at.
    #[serde(default = "default_view_path")]
    pub view_path: String,

    /// Outbound queue slots; events beyond this are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_socket() -> String {
    gasp_server::DEFAULT_SOCKET.to_string()
}
fn default_view_path() -> String {
    "/".to_string()
}
fn default_queue_capacity() -> usize {
    gasp_middleware::DEFAULT_QUEUE_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            view_path: default_view_path(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Return the path to `~/.gasp/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".gasp").join("config.toml")
}

/// Load the config from disk with `GASP_*` overrides applied.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `GASP_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `GASP_SOCKET` | `socket` |
/// | `GASP_VIEW_PATH` | `view_path` |
/// | `GASP_QUEUE_CAPACITY` | `queue_capacity` |
///
/// A capacity that does not parse is ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("GASP_SOCKET") {
        cfg.socket = v;
    }
    if let Ok(v) = std::env::var("GASP_VIEW_PATH") {
        cfg.view_path = v;
    }
    if let Ok(v) = std::env::var("GASP_QUEUE_CAPACITY")
        && let Ok(capacity) = v.parse::<usize>()
    {
        cfg.queue_capacity = capacity;
    }
}

/// Save the config to disk, creating `~/.gasp/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
