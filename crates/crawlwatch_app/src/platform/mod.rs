mod app;
mod commands;
mod config;
mod effects;
mod logging;
mod render;

pub use app::{run_watch, WatchOptions};
pub use commands::{cancel, create, list};
pub use config::{AppConfig, DEFAULT_CONFIG_FILE};
pub use logging::{initialize as initialize_logging, LogDestination};
