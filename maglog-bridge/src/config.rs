use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub serial: SerialConfig,
    pub radio: RadioConfig,
}

#[derive(Debug, Deserialize)]
pub struct SerialConfig {
    /// Serial device wired to the station.
    pub device: String,
    pub baud: u32,
}

#[derive(Debug, Deserialize)]
pub struct RadioConfig {
    /// Serial device of the packet radio modem.
    pub device: String,
    pub baud: u32,
    /// Radio channel shared with the field nodes.
    pub channel: u8,
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
            radio: RadioConfig {
                device: "/dev/ttyUSB0".to_string(),
                baud: 115_200,
                channel: 1,
            },
        }
    }
}
