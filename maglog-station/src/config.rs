use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub serial: SerialConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
}

#[derive(Debug, Deserialize)]
pub struct SerialConfig {
    /// Serial device wired to the bridge.
    pub device: String,
    pub baud: u32,
}

#[derive(Debug, Deserialize)]
pub struct DataConfig {
    /// Root directory for the per-day logs.
    pub dir: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
pub struct SheetsConfig {
    /// Endpoint receiving the day reports. Uploads are skipped when unset.
    pub endpoint: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig {
                device: "/dev/ttyACM0".to_string(),
                baud: 115_200,
            },
            data: DataConfig {
                dir: PathBuf::from("data"),
            },
            sheets: SheetsConfig::default(),
        }
    }
}
