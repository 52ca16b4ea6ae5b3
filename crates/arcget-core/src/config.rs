use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_block_size() -> usize {
    64 * 1024
}

/// Client configuration loaded from `~/.config/arcget/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Archive server host.
    pub host: String,
    /// Archive server port.
    pub port: u16,
    /// Optional `Authorization` header value sent with every command.
    #[serde(default)]
    pub authorization: Option<String>,
    /// Buffer size in bytes for body copies.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Directory where retrieved files land unless overridden per call.
    #[serde(default)]
    pub retrieve_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7777,
            authorization: None,
            block_size: default_block_size(),
            retrieve_dir: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("arcget")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ClientConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ClientConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ClientConfig = toml::from_str(&data)?;
    Ok(cfg)
}
