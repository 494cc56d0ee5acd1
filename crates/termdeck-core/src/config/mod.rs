pub mod app_config;
pub mod watcher;

pub use app_config::{AppConfig, GeneralConfig, RunConfig, TerminalConfig};
pub use watcher::ConfigWatcher;
