use crate::error::{Result, TermDeckError};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches the TermDeck config file and invokes a callback when it changes.
pub struct ConfigWatcher {
    config_path: PathBuf,
    _watcher: Option<RecommendedWatcher>,
}

impl ConfigWatcher {
    /// Watch the default config location.
    pub fn new() -> Self {
        Self::with_path(super::AppConfig::config_path())
    }

    /// Watch a specific config file.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            _watcher: None,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn is_running(&self) -> bool {
        self._watcher.is_some()
    }

    /// The path handed to notify: the file itself, or its directory while the
    /// file does not exist yet.
    fn watch_target(&self) -> PathBuf {
        if self.config_path.exists() {
            self.config_path.clone()
        } else {
            self.config_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| self.config_path.clone())
        }
    }

    /// Start watching. `callback` runs on a background thread, debounced to
    /// one call per 500ms. Watching stops when the `ConfigWatcher` is dropped.
    pub fn start<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn() + Send + 'static,
    {
        let watch_path = self.watch_target();
        let target_path = self.config_path.clone();
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |event: std::result::Result<notify::Event, notify::Error>| {
                if let Ok(event) = event {
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                        && event.paths.iter().any(|p| p == &target_path)
                    {
                        let _ = tx.send(());
                    }
                }
            },
            Config::default(),
        )
        .map_err(|e| TermDeckError::Config(format!("Failed to create file watcher: {}", e)))?;

        watcher
            .watch(&watch_path, RecursiveMode::NonRecursive)
            .map_err(|e| {
                TermDeckError::Config(format!(
                    "Failed to watch {}: {}",
                    watch_path.display(),
                    e
                ))
            })?;

        info!("Watching {} for changes", watch_path.display());

        std::thread::Builder::new()
            .name("config-watcher".to_string())
            .spawn(move || {
                let mut last_trigger: Option<Instant> = None;

                while rx.recv().is_ok() {
                    let now = Instant::now();
                    match last_trigger {
                        Some(last) if now.duration_since(last) < DEBOUNCE => {
                            debug!("Config change debounced");
                        }
                        _ => {
                            last_trigger = Some(now);
                            debug!("Config changed, triggering callback");
                            callback();
                        }
                    }
                }
                debug!("Config watcher channel closed, stopping");
            })
            .map_err(|e| TermDeckError::Config(format!("Failed to spawn watcher thread: {}", e)))?;

        self._watcher = Some(watcher);
        Ok(())
    }
}

impl Default for ConfigWatcher {
    fn default() -> Self {
        Self::new()
    }
}
