//! Client configuration.
//!
//! The configuration is loaded from a JSON file, by default
//! `$XDG_CONFIG_HOME/mss/config.json`.  Every field is optional.
//!
//! # Example
//!
//! ```json
//! {
//!   "socket_path": "/tmp/mss_alice.socket",
//!   "timeout_ms": 5000,
//!   "install": {
//!     "bundle": "/usr/local/share/mss/mss.osax",
//!     "target_dir": "/Library/ScriptingAdditions",
//!     "loader": "/usr/local/libexec/mss-loader"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
///
/// A minimal `{}` file is valid; all fields fall back to their compiled-in
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Override for the scripting addition socket.  When unset the path is
    /// derived from the invoking user, see [`default_socket_path`].
    pub socket_path: Option<PathBuf>,
    /// Read/write timeout applied to every call (ms).
    pub timeout_ms: u64,
    /// Where the scripting addition bundle comes from and goes to.
    pub install: InstallConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: None,
            timeout_ms: 5000,
            install: InstallConfig::default(),
        }
    }
}

/// Paths used by the install / load flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// The `.osax` bundle shipped with the client.
    pub bundle: PathBuf,
    /// System directory the bundle is copied into.
    pub target_dir: PathBuf,
    /// Executable that makes Dock load the installed bundle.
    pub loader: PathBuf,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            bundle: PathBuf::from("/usr/local/share/mss/mss.osax"),
            target_dir: PathBuf::from("/Library/ScriptingAdditions"),
            loader: PathBuf::from("/usr/local/libexec/mss-loader"),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every connection fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError("timeout_ms must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The socket path to connect to: the override if set, otherwise the
    /// per-user default.
    pub fn resolve_socket_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.socket_path {
            Some(path) if path.as_os_str().is_empty() => {
                Err(ConfigError("socket_path must not be empty".into()))
            }
            Some(path) => Ok(path.clone()),
            None => default_socket_path(),
        }
    }
}

/// `/tmp/mss_<username>.socket` for the real user running the process.
pub fn default_socket_path() -> Result<PathBuf, ConfigError> {
    let name = current_user_name()?;
    Ok(socket_path_for(&name))
}

fn socket_path_for(user: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/mss_{}.socket", user))
}

fn current_user_name() -> Result<String, ConfigError> {
    let uid = nix::unistd::getuid();
    match nix::unistd::User::from_uid(uid) {
        Ok(Some(user)) => Ok(user.name),
        _ => std::env::var("USER")
            .ok()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ConfigError(format!("cannot resolve user name for uid {}", uid))),
    }
}

/// Error from loading or resolving configuration.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
