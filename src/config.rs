use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use anyhow::Result;

pub const DEFAULT_PORT: u16 = 6198;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_address: String,
    pub store_file: PathBuf,
    pub max_connections: usize,
    pub read_timeout_secs: u64,
    pub auto_create_directories: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: format!("0.0.0.0:{}", DEFAULT_PORT),
            store_file: PathBuf::from("./data/dictionary.txt"),
            max_connections: 64,
            read_timeout_secs: 300,
            auto_create_directories: true,
        }
    }
}

impl ServerConfig {
    pub fn load_or_create(config_path: Option<&str>) -> Result<Self> {
        let config_file = config_path.unwrap_or("lexicond.toml");

        if std::path::Path::new(config_file).exists() {
            let content = std::fs::read_to_string(config_file)?;
            let config: ServerConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(config_file)?;
            Ok(config)
        }
    }

    pub fn save(&self, config_path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if self.auto_create_directories {
            if let Some(parent) = self.store_file.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                    tracing::info!("Created data directory: {:?}", parent);
                }
            }
        }
        Ok(())
    }

    /// Per-read socket timeout; 0 disables it.
    pub fn read_timeout(&self) -> Option<Duration> {
        if self.read_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.read_timeout_secs))
        }
    }
}
