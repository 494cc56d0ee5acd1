//! An in-memory backend that records every operation instead of driving a
//! real PTY. Used by the console binary and throughout the tests.

use crate::instance::{LaunchOptions, TerminalBackend, TerminalBackendFactory};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use termdeck_core::{InstanceId, TermDeckError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOp {
    Spawned,
    CopySelection,
    Paste,
    SendText { text: String, add_new_line: bool },
    ScrollUp,
    ScrollDown,
    Dispose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub instance: InstanceId,
    pub op: BackendOp,
}

/// Shared, append-only record of backend operations.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    fn record(&self, instance: InstanceId, op: BackendOp) {
        self.entries.lock().push(JournalEntry { instance, op });
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().clone()
    }

    pub fn ops_for(&self, instance: InstanceId) -> Vec<BackendOp> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.instance == instance)
            .map(|e| e.op.clone())
            .collect()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<JournalEntry> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

pub struct HeadlessBackend {
    id: InstanceId,
    journal: Journal,
}

impl TerminalBackend for HeadlessBackend {
    fn copy_selection(&self) {
        self.journal.record(self.id, BackendOp::CopySelection);
    }

    fn paste(&self) {
        self.journal.record(self.id, BackendOp::Paste);
    }

    fn send_text(&self, text: &str, add_new_line: bool) {
        tracing::debug!("{}: send {} bytes", self.id, text.len());
        self.journal.record(
            self.id,
            BackendOp::SendText {
                text: text.to_string(),
                add_new_line,
            },
        );
    }

    fn scroll_up(&self) {
        self.journal.record(self.id, BackendOp::ScrollUp);
    }

    fn scroll_down(&self) {
        self.journal.record(self.id, BackendOp::ScrollDown);
    }

    fn dispose(&self) {
        self.journal.record(self.id, BackendOp::Dispose);
    }
}

#[derive(Default)]
pub struct HeadlessBackendFactory {
    journal: Journal,
    fail_spawns: AtomicBool,
}

impl HeadlessBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Make subsequent spawns fail, to exercise error paths.
    pub fn set_fail_spawns(&self, fail: bool) {
        self.fail_spawns.store(fail, Ordering::SeqCst);
    }
}

impl TerminalBackendFactory for HeadlessBackendFactory {
    fn spawn(
        &self,
        id: InstanceId,
        options: &LaunchOptions,
    ) -> termdeck_core::Result<Box<dyn TerminalBackend>> {
        if self.fail_spawns.load(Ordering::SeqCst) {
            return Err(TermDeckError::Backend(format!(
                "refusing to spawn {}",
                options.shell.as_deref().unwrap_or("default shell")
            )));
        }
        tracing::debug!("Spawned headless terminal {} ({})", id, options.title);
        self.journal.record(id, BackendOp::Spawned);
        Ok(Box::new(HeadlessBackend {
            id,
            journal: self.journal.clone(),
        }))
    }
}
