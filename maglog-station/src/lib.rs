pub mod config;
pub mod engine;
pub mod error;
pub mod logger;
pub mod sheet;

pub use config::{Config, DataConfig, SerialConfig, SheetsConfig};
pub use engine::Engine;
pub use error::FatalError;
pub use logger::{DeviceLog, EventLogger, SummaryEntry, TimeAnchor};
pub use sheet::{DayReport, SheetClient, SheetError};
