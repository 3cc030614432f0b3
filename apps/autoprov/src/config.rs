//! Host configuration.
//!
//! Stored as TOML:
//! - Linux: `~/.config/autoprov/autoprov.toml`
//! - Windows: `%APPDATA%/autoprov/autoprov.toml`

use std::path::{Path, PathBuf};

use autoprov_provisioning::ProvisioningConfig;
use serde::{Deserialize, Serialize};

/// Host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JSON file holding the device id and last working provisioning URL.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// File listing imported configuration URIs, one per line.
    #[serde(default = "default_servers_file")]
    pub servers_file: PathBuf,

    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

fn default_state_file() -> PathBuf {
    app_dir().join("state.json")
}

fn default_servers_file() -> PathBuf {
    app_dir().join("servers.txt")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            servers_file: default_servers_file(),
            provisioning: ProvisioningConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path` (or the default location), writing
    /// defaults there if the file does not exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Default configuration file path.
fn config_path() -> PathBuf {
    app_dir().join("autoprov.toml")
}

/// Platform-specific application directory.
fn app_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config").join("autoprov")
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("autoprov")
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        PathBuf::from("/tmp/autoprov")
    }
}
