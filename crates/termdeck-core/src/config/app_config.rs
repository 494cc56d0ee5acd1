use crate::error::{Result, TermDeckError};
use crate::line_ending::LineEnding;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub terminal: TerminalConfig,
    pub run: RunConfig,
    pub general: GeneralConfig,
}

/// How new terminal instances are launched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Shell executable. `None` means the backend picks its default.
    pub shell: Option<String>,
    pub shell_args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Title for new instances. Falls back to the shell name.
    pub default_title: Option<String>,
}

/// Settings for the run-selected-text command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub line_ending: LineEnding,
    /// Append a newline so the shell executes the text immediately.
    pub add_new_line: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            line_ending: LineEnding::Native,
            add_new_line: true,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_filter: "termdeck=info,warn".to_string(),
        }
    }
}

impl TerminalConfig {
    /// Title given to a freshly created instance.
    pub fn initial_title(&self) -> String {
        if let Some(title) = self.default_title.as_deref().filter(|t| !t.trim().is_empty()) {
            return title.to_string();
        }
        self.shell
            .as_deref()
            .and_then(|shell| Path::new(shell).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "Terminal".to_string())
    }
}

impl AppConfig {
    /// Get the project directories for TermDeck.
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "termdeck", "TermDeck").ok_or_else(|| {
            TermDeckError::Config("Could not determine config directory".to_string())
        })
    }

    /// Get the config directory path.
    pub fn config_dir() -> PathBuf {
        match Self::project_dirs() {
            Ok(dirs) => dirs.config_dir().to_path_buf(),
            Err(_) => {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".config").join("termdeck")
            }
        }
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location, or create and save defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content).map_err(|e| {
                TermDeckError::Config(format!(
                    "Failed to parse config at {}: {}",
                    path.display(),
                    e
                ))
            })?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            TermDeckError::Serialization(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(path, content)?;
        info!("Saved config to {}", path.display());

        Ok(())
    }
}
