pub mod commands;
pub mod editor;
pub mod panel;
pub mod selector;

pub use commands::{CommandContext, CommandId, CommandTable};
pub use editor::{BufferEditor, CodeEditor, EditorService, FocusedEditor, Selection};
pub use panel::{HeadlessPanel, PanelController, PanelState, PanelTask};
pub use selector::{InstanceSelector, SelectorView};
