pub mod config;
pub mod error;
pub mod line_ending;

pub use error::{Result, TermDeckError};
pub use line_ending::LineEnding;

/// Identity of a terminal instance. Stable for the instance's lifetime and
/// never reused after disposal.
pub type InstanceId = uuid::Uuid;

/// Application version, resolved at compile time from the workspace Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
