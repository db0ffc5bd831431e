pub mod config;
pub mod indicator;
pub mod relay;

pub use config::{Config, RadioConfig, SerialConfig};
pub use indicator::{Indicator, LogIndicator};
pub use relay::Relay;
