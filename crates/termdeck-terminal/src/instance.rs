use crate::event::{EventEmitter, Subscription};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use termdeck_core::config::TerminalConfig;
use termdeck_core::InstanceId;

/// The process/PTY side of one terminal. Implemented outside this crate by
/// whatever actually runs shells; see [`crate::headless`] for an in-memory one.
pub trait TerminalBackend: Send + Sync {
    fn copy_selection(&self);
    fn paste(&self);
    fn send_text(&self, text: &str, add_new_line: bool);
    fn scroll_up(&self);
    fn scroll_down(&self);
    /// Release the underlying process. Called at most once.
    fn dispose(&self);
}

/// Creates backends for new instances.
pub trait TerminalBackendFactory: Send + Sync {
    fn spawn(
        &self,
        id: InstanceId,
        options: &LaunchOptions,
    ) -> termdeck_core::Result<Box<dyn TerminalBackend>>;
}

/// Parameters for launching a new instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub shell: Option<String>,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub title: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::from(&TerminalConfig::default())
    }
}

impl From<&TerminalConfig> for LaunchOptions {
    fn from(config: &TerminalConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            args: config.shell_args.clone(),
            cwd: config.cwd.clone(),
            title: config.initial_title(),
        }
    }
}

pub type InstanceHandle = Arc<TerminalInstance>;

/// One terminal in the panel.
///
/// Handles are shared freely; only the registry decides membership. Once
/// disposed, every operation becomes a no-op.
pub struct TerminalInstance {
    id: InstanceId,
    created_at: DateTime<Utc>,
    title: Mutex<String>,
    disposed: AtomicBool,
    backend: Box<dyn TerminalBackend>,
    on_disposed: EventEmitter<()>,
    on_title_changed: EventEmitter<String>,
}

impl TerminalInstance {
    pub fn new(id: InstanceId, title: String, backend: Box<dyn TerminalBackend>) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            title: Mutex::new(title),
            disposed: AtomicBool::new(false),
            backend,
            on_disposed: EventEmitter::new(),
            on_title_changed: EventEmitter::new(),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn title(&self) -> String {
        self.title.lock().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Update the display title, e.g. when the shell reports a new one.
    /// Emits only when the title actually changes.
    pub fn set_title(&self, title: impl Into<String>) {
        if self.is_disposed() {
            return;
        }
        let title = title.into();
        {
            let mut current = self.title.lock();
            if *current == title {
                return;
            }
            *current = title.clone();
        }
        self.on_title_changed.emit(&title);
    }

    /// Dispose the backend and notify listeners. Safe to call repeatedly,
    /// whether from a kill command or because the process went away.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("Disposing terminal instance {}", self.id);
        self.backend.dispose();
        self.on_disposed.emit(&());
    }

    pub fn copy_selection(&self) {
        if !self.is_disposed() {
            self.backend.copy_selection();
        }
    }

    pub fn paste(&self) {
        if !self.is_disposed() {
            self.backend.paste();
        }
    }

    pub fn send_text(&self, text: &str, add_new_line: bool) {
        if !self.is_disposed() {
            self.backend.send_text(text, add_new_line);
        }
    }

    pub fn scroll_up(&self) {
        if !self.is_disposed() {
            self.backend.scroll_up();
        }
    }

    pub fn scroll_down(&self) {
        if !self.is_disposed() {
            self.backend.scroll_down();
        }
    }

    pub fn on_disposed(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.on_disposed.subscribe(move |_| listener())
    }

    pub fn on_title_changed(
        &self,
        listener: impl Fn(&str) + Send + Sync + 'static,
    ) -> Subscription {
        self.on_title_changed.subscribe(move |title: &String| listener(title))
    }
}

impl std::fmt::Debug for TerminalInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalInstance")
            .field("id", &self.id)
            .field("title", &self.title())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{BackendOp, HeadlessBackendFactory};

    fn instance(factory: &HeadlessBackendFactory) -> TerminalInstance {
        let id = InstanceId::new_v4();
        let backend = factory.spawn(id, &LaunchOptions::default()).unwrap();
        TerminalInstance::new(id, "bash".to_string(), backend)
    }

    #[test]
    fn test_launch_options_from_config() {
        let config = TerminalConfig {
            shell: Some("/bin/zsh".to_string()),
            shell_args: vec!["-l".to_string()],
            cwd: Some(PathBuf::from("/tmp")),
            default_title: None,
        };
        let options = LaunchOptions::from(&config);
        assert_eq!(options.shell.as_deref(), Some("/bin/zsh"));
        assert_eq!(options.args, vec!["-l".to_string()]);
        assert_eq!(options.title, "zsh");
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let factory = HeadlessBackendFactory::new();
        let instance = instance(&factory);
        let count = Arc::new(Mutex::new(0));
        let _sub = {
            let count = count.clone();
            instance.on_disposed(move || *count.lock() += 1)
        };

        instance.dispose();
        instance.dispose();

        assert!(instance.is_disposed());
        assert_eq!(*count.lock(), 1);
        let disposes = factory
            .journal()
            .ops_for(instance.id())
            .into_iter()
            .filter(|op| *op == BackendOp::Dispose)
            .count();
        assert_eq!(disposes, 1);
    }

    #[test]
    fn test_operations_after_dispose_are_dropped() {
        let factory = HeadlessBackendFactory::new();
        let instance = instance(&factory);
        instance.dispose();
        instance.paste();
        instance.send_text("ls", true);
        instance.scroll_up();

        assert_eq!(
            factory.journal().ops_for(instance.id()),
            vec![BackendOp::Spawned, BackendOp::Dispose]
        );
    }

    #[test]
    fn test_title_change_emits_only_on_change() {
        let factory = HeadlessBackendFactory::new();
        let instance = instance(&factory);
        let titles = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let titles = titles.clone();
            instance.on_title_changed(move |t| titles.lock().push(t.to_string()))
        };

        instance.set_title("bash");
        instance.set_title("vim");
        instance.set_title("vim");

        assert_eq!(instance.title(), "vim");
        assert_eq!(*titles.lock(), vec!["vim".to_string()]);
    }
}
