pub mod config;
pub mod types;

pub use config::{ConfigError, WatchConfig};
pub use types::*;
