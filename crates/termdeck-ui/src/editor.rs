use parking_lot::Mutex;
use ropey::Rope;
use std::ops::Range;
use std::sync::Arc;
use termdeck_core::LineEnding;

/// A selection in char offsets. `anchor == head` is a bare caret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn caret(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Ordered range regardless of selection direction.
    pub fn range(&self) -> Range<usize> {
        self.anchor.min(self.head)..self.anchor.max(self.head)
    }
}

/// The text-editing surface the run command reads from.
pub trait CodeEditor: Send + Sync {
    fn selection(&self) -> Selection;
    /// The whole document as stored.
    fn text(&self) -> String;
    /// Text covered by `range` (char offsets), line endings rewritten.
    fn text_in_range(&self, range: Range<usize>, line_ending: LineEnding) -> String;
}

/// Tells commands which editor currently has focus.
pub trait EditorService: Send + Sync {
    fn focused_editor(&self) -> Option<Arc<dyn CodeEditor>>;
}

struct BufferState {
    rope: Rope,
    selection: Selection,
}

/// Rope-backed in-memory editor.
pub struct BufferEditor {
    state: Mutex<BufferState>,
}

impl BufferEditor {
    pub fn new(text: &str) -> Self {
        Self {
            state: Mutex::new(BufferState {
                rope: Rope::from_str(text),
                selection: Selection::default(),
            }),
        }
    }

    /// Replace the whole document; the selection collapses to the start.
    pub fn set_text(&self, text: &str) {
        let mut state = self.state.lock();
        state.rope = Rope::from_str(text);
        state.selection = Selection::default();
    }

    /// Select `selection`, clamped to the document length.
    pub fn select(&self, selection: Selection) {
        let mut state = self.state.lock();
        let len = state.rope.len_chars();
        state.selection = Selection::new(selection.anchor.min(len), selection.head.min(len));
    }

    pub fn select_all(&self) {
        let mut state = self.state.lock();
        let len = state.rope.len_chars();
        state.selection = Selection::new(0, len);
    }

    pub fn len_chars(&self) -> usize {
        self.state.lock().rope.len_chars()
    }
}

impl Default for BufferEditor {
    fn default() -> Self {
        Self::new("")
    }
}

impl CodeEditor for BufferEditor {
    fn selection(&self) -> Selection {
        self.state.lock().selection
    }

    fn text(&self) -> String {
        self.state.lock().rope.to_string()
    }

    fn text_in_range(&self, range: Range<usize>, line_ending: LineEnding) -> String {
        let state = self.state.lock();
        let len = state.rope.len_chars();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        line_ending.normalize(&state.rope.slice(start..end).to_string())
    }
}

/// Tracks the single focused editor, if any.
#[derive(Default)]
pub struct FocusedEditor {
    focused: Mutex<Option<Arc<dyn CodeEditor>>>,
}

impl FocusedEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self, editor: Arc<dyn CodeEditor>) {
        *self.focused.lock() = Some(editor);
    }

    pub fn blur(&self) {
        self.focused.lock().take();
    }
}

impl EditorService for FocusedEditor {
    fn focused_editor(&self) -> Option<Arc<dyn CodeEditor>> {
        self.focused.lock().clone()
    }
}
