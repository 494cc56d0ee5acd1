//! User-invokable terminal commands.
//!
//! Each command is a plain function over a [`CommandContext`], registered in
//! a [`CommandTable`] under its stable identifier. Handlers do their registry
//! work synchronously and hand back the pending panel operation, if any.

use crate::editor::{CodeEditor, EditorService};
use crate::panel::{PanelController, PanelTask};
use futures::future::{self, FutureExt};
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use termdeck_core::config::RunConfig;
use termdeck_core::{LineEnding, Result, TermDeckError};
use termdeck_terminal::{InstanceHandle, TerminalRegistry};
use tracing::debug;

/// Prefix of the fully-qualified command identifiers.
pub const COMMAND_PREFIX: &str = "workbench.action.terminal.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    ToggleTerminal,
    Kill,
    CopySelection,
    New,
    Focus,
    FocusNext,
    FocusPrevious,
    Paste,
    RunSelectedText,
    SwitchTerminalInstance,
    ScrollDown,
    ScrollUp,
}

impl CommandId {
    pub const ALL: [CommandId; 12] = [
        CommandId::ToggleTerminal,
        CommandId::Kill,
        CommandId::CopySelection,
        CommandId::New,
        CommandId::Focus,
        CommandId::FocusNext,
        CommandId::FocusPrevious,
        CommandId::Paste,
        CommandId::RunSelectedText,
        CommandId::SwitchTerminalInstance,
        CommandId::ScrollDown,
        CommandId::ScrollUp,
    ];

    /// Stable identifier used by palettes, menus and keybindings.
    pub fn id(self) -> &'static str {
        match self {
            CommandId::ToggleTerminal => "toggleTerminal",
            CommandId::Kill => "kill",
            CommandId::CopySelection => "copySelection",
            CommandId::New => "new",
            CommandId::Focus => "focus",
            CommandId::FocusNext => "focusNext",
            CommandId::FocusPrevious => "focusPrevious",
            CommandId::Paste => "paste",
            CommandId::RunSelectedText => "runSelectedText",
            CommandId::SwitchTerminalInstance => "switchTerminalInstance",
            CommandId::ScrollDown => "scrollDown",
            CommandId::ScrollUp => "scrollUp",
        }
    }

    pub fn qualified_id(self) -> String {
        format!("{}{}", COMMAND_PREFIX, self.id())
    }

    pub fn label(self) -> &'static str {
        match self {
            CommandId::ToggleTerminal => "Toggle Integrated Terminal",
            CommandId::Kill => "Kill the Active Terminal Instance",
            CommandId::CopySelection => "Copy Selection",
            CommandId::New => "Create New Integrated Terminal",
            CommandId::Focus => "Focus Terminal",
            CommandId::FocusNext => "Focus Next Terminal",
            CommandId::FocusPrevious => "Focus Previous Terminal",
            CommandId::Paste => "Paste into Active Terminal",
            CommandId::RunSelectedText => "Run Selected Text In Active Terminal",
            CommandId::SwitchTerminalInstance => "Switch Terminal Instance",
            CommandId::ScrollDown => "Scroll Down",
            CommandId::ScrollUp => "Scroll Up",
        }
    }

    /// Shorter label for buttons in the panel's title bar.
    pub fn panel_label(self) -> Option<&'static str> {
        match self {
            CommandId::Kill => Some("Kill Terminal"),
            CommandId::New => Some("New Terminal"),
            _ => None,
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CommandId {
    type Err = TermDeckError;

    /// Accepts both `kill` and `workbench.action.terminal.kill`.
    fn from_str(s: &str) -> Result<Self> {
        let short = s.strip_prefix(COMMAND_PREFIX).unwrap_or(s);
        CommandId::ALL
            .into_iter()
            .find(|c| c.id() == short)
            .ok_or_else(|| TermDeckError::UnknownCommand(s.to_string()))
    }
}

/// Everything a command handler may touch.
pub struct CommandContext {
    pub registry: Arc<TerminalRegistry>,
    pub panel: Arc<dyn PanelController>,
    pub editors: Arc<dyn EditorService>,
    run: Mutex<RunConfig>,
}

impl CommandContext {
    pub fn new(
        registry: Arc<TerminalRegistry>,
        panel: Arc<dyn PanelController>,
        editors: Arc<dyn EditorService>,
        run: RunConfig,
    ) -> Self {
        Self {
            registry,
            panel,
            editors,
            run: Mutex::new(run),
        }
    }

    pub fn run_config(&self) -> RunConfig {
        self.run.lock().clone()
    }

    pub fn set_run_config(&self, run: RunConfig) {
        *self.run.lock() = run;
    }

    /// The active instance, creating (and activating) one if there is none.
    fn ensure_active(&self) -> Result<InstanceHandle> {
        if let Some(instance) = self.registry.active_instance() {
            return Ok(instance);
        }
        let instance = self.registry.create_instance()?;
        self.registry.set_active_instance(&instance);
        Ok(instance)
    }

    fn show_focused(&self) -> Result<PanelTask> {
        Ok(self.panel.show_panel(true))
    }
}

pub type CommandHandler = fn(&CommandContext, Option<&str>) -> Result<PanelTask>;

fn done() -> Result<PanelTask> {
    Ok(future::ready(Ok(())).boxed())
}

fn toggle_terminal(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    Ok(ctx.panel.toggle_panel())
}

fn kill(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    let Some(instance) = ctx.registry.active_instance() else {
        return done();
    };
    instance.dispose();
    if ctx.registry.is_empty() {
        done()
    } else {
        ctx.show_focused()
    }
}

fn copy_selection(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    if let Some(instance) = ctx.registry.active_instance() {
        instance.copy_selection();
    }
    done()
}

fn new_terminal(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    let instance = ctx.registry.create_instance()?;
    ctx.registry.set_active_instance(&instance);
    ctx.show_focused()
}

fn focus(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    ctx.ensure_active()?;
    ctx.show_focused()
}

fn focus_next(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    ctx.registry.set_active_instance_to_next();
    ctx.show_focused()
}

fn focus_previous(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    ctx.registry.set_active_instance_to_previous();
    ctx.show_focused()
}

fn paste(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    ctx.ensure_active()?.paste();
    done()
}

/// What the run command sends: the selection, or the whole document when
/// nothing is selected.
pub fn text_to_run(editor: &dyn CodeEditor, line_ending: LineEnding) -> String {
    let selection = editor.selection();
    if selection.is_empty() {
        line_ending.normalize(&editor.text())
    } else {
        editor.text_in_range(selection.range(), line_ending)
    }
}

fn run_selected_text(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    let editor = ctx
        .editors
        .focused_editor()
        .ok_or(TermDeckError::NoFocusedEditor)?;
    let instance = ctx.ensure_active()?;
    let run = ctx.run_config();
    let text = text_to_run(editor.as_ref(), run.line_ending);
    instance.send_text(&text, run.add_new_line);
    done()
}

/// Parse a selector label `"<n>: <title>"` into a zero-based index.
pub fn parse_switch_label(label: &str) -> Result<usize> {
    let number = label.split(':').next().unwrap_or_default().trim();
    match number.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(TermDeckError::MalformedSwitchLabel(label.to_string())),
    }
}

fn switch_terminal_instance(ctx: &CommandContext, arg: Option<&str>) -> Result<PanelTask> {
    let label = arg.ok_or_else(|| TermDeckError::MalformedSwitchLabel(String::new()))?;
    let index = parse_switch_label(label)?;
    ctx.registry.set_active_instance_by_index(index)?;
    ctx.show_focused()
}

fn scroll_down(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    if let Some(instance) = ctx.registry.active_instance() {
        instance.scroll_down();
    }
    done()
}

fn scroll_up(ctx: &CommandContext, _: Option<&str>) -> Result<PanelTask> {
    if let Some(instance) = ctx.registry.active_instance() {
        instance.scroll_up();
    }
    done()
}

fn handler_for(id: CommandId) -> CommandHandler {
    match id {
        CommandId::ToggleTerminal => toggle_terminal,
        CommandId::Kill => kill,
        CommandId::CopySelection => copy_selection,
        CommandId::New => new_terminal,
        CommandId::Focus => focus,
        CommandId::FocusNext => focus_next,
        CommandId::FocusPrevious => focus_previous,
        CommandId::Paste => paste,
        CommandId::RunSelectedText => run_selected_text,
        CommandId::SwitchTerminalInstance => switch_terminal_instance,
        CommandId::ScrollDown => scroll_down,
        CommandId::ScrollUp => scroll_up,
    }
}

/// Dispatches commands to their handlers against a shared context.
pub struct CommandTable {
    context: CommandContext,
}

impl CommandTable {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Run a command by its short or qualified identifier.
    pub fn run(&self, command: &str, arg: Option<&str>) -> Result<PanelTask> {
        self.execute(command.parse()?, arg)
    }

    pub fn execute(&self, id: CommandId, arg: Option<&str>) -> Result<PanelTask> {
        let handler = handler_for(id);
        debug!("Running command {} (arg: {:?})", id, arg);
        handler(&self.context, arg)
    }

    /// Commands whose label fuzzily matches `query`, in table order.
    pub fn search(&self, query: &str) -> Vec<CommandId> {
        let query = query.to_lowercase();
        CommandId::ALL
            .into_iter()
            .filter(|id| fuzzy_match(id.label(), &query))
            .collect()
    }
}

/// Simple fuzzy subsequence match. `needle` must already be lowercase.
pub fn fuzzy_match(haystack: &str, needle: &str) -> bool {
    let haystack = haystack.to_lowercase();
    let mut haystack_chars = haystack.chars();
    needle
        .chars()
        .all(|needle_char| haystack_chars.any(|h| h == needle_char))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{BufferEditor, FocusedEditor, Selection};
    use crate::panel::HeadlessPanel;
    use futures::executor::block_on;
    use termdeck_terminal::headless::{BackendOp, HeadlessBackendFactory, Journal};
    use termdeck_terminal::LaunchOptions;

    struct Harness {
        table: CommandTable,
        registry: Arc<TerminalRegistry>,
        panel: HeadlessPanel,
        editors: Arc<FocusedEditor>,
        factory: Arc<HeadlessBackendFactory>,
    }

    impl Harness {
        fn new() -> Self {
            let factory = Arc::new(HeadlessBackendFactory::new());
            let registry = TerminalRegistry::new(factory.clone(), LaunchOptions::default());
            let panel = HeadlessPanel::new();
            let editors = Arc::new(FocusedEditor::new());
            let context = CommandContext::new(
                registry.clone(),
                Arc::new(panel.clone()),
                editors.clone(),
                RunConfig {
                    line_ending: LineEnding::Lf,
                    add_new_line: true,
                },
            );
            Self {
                table: CommandTable::new(context),
                registry,
                panel,
                editors,
                factory,
            }
        }

        fn with_instances(n: usize) -> (Self, Vec<InstanceHandle>) {
            let harness = Self::new();
            let instances = (0..n)
                .map(|_| harness.registry.create_instance().unwrap())
                .collect();
            (harness, instances)
        }

        fn run(&self, command: &str, arg: Option<&str>) -> Result<()> {
            let task = self.table.run(command, arg)?;
            block_on(task)
        }

        fn journal(&self) -> Journal {
            self.factory.journal()
        }

        fn active(&self) -> Option<InstanceHandle> {
            self.registry.active_instance()
        }
    }

    #[test]
    fn test_identifiers_round_trip() {
        for id in CommandId::ALL {
            assert_eq!(id.id().parse::<CommandId>().unwrap(), id);
            assert_eq!(id.qualified_id().parse::<CommandId>().unwrap(), id);
        }
        assert_eq!(
            CommandId::ToggleTerminal.qualified_id(),
            "workbench.action.terminal.toggleTerminal"
        );
    }

    #[test]
    fn test_unknown_command() {
        let harness = Harness::new();
        let err = harness.run("explode", None).unwrap_err();
        assert!(matches!(err, TermDeckError::UnknownCommand(ref s) if s == "explode"));
    }

    #[test]
    fn test_toggle_does_not_touch_instances() {
        let harness = Harness::new();
        harness.run("toggleTerminal", None).unwrap();
        assert!(harness.panel.is_visible());
        assert!(harness.registry.is_empty());

        harness.run("toggleTerminal", None).unwrap();
        assert!(!harness.panel.is_visible());
    }

    #[test]
    fn test_kill_without_active_is_noop() {
        let harness = Harness::new();
        harness.run("kill", None).unwrap();
        assert!(harness.registry.is_empty());
        assert!(!harness.panel.is_visible());
        assert!(harness.journal().is_empty());
    }

    #[test]
    fn test_kill_disposes_active_and_shows_remaining() {
        let (harness, instances) = Harness::with_instances(2);
        harness.registry.set_active_instance(&instances[1]);

        harness.run("kill", None).unwrap();
        assert!(instances[1].is_disposed());
        assert_eq!(harness.active().unwrap().id(), instances[0].id());
        assert!(harness.panel.is_visible());
        assert!(harness.panel.is_focused());
    }

    #[test]
    fn test_kill_last_does_not_show_panel() {
        let (harness, instances) = Harness::with_instances(1);
        harness.run("kill", None).unwrap();
        assert!(instances[0].is_disposed());
        assert!(harness.registry.is_empty());
        assert!(!harness.panel.is_visible());
    }

    #[test]
    fn test_copy_and_scroll_target_active() {
        let (harness, instances) = Harness::with_instances(2);
        harness.registry.set_active_instance(&instances[1]);
        harness.journal().drain();

        harness.run("copySelection", None).unwrap();
        harness.run("scrollUp", None).unwrap();
        harness.run("scrollDown", None).unwrap();

        assert_eq!(
            harness.journal().ops_for(instances[1].id()),
            vec![BackendOp::CopySelection, BackendOp::ScrollUp, BackendOp::ScrollDown]
        );
        assert!(harness.journal().ops_for(instances[0].id()).is_empty());
        assert!(!harness.panel.is_visible());
    }

    #[test]
    fn test_copy_and_scroll_without_active_are_noops() {
        let harness = Harness::new();
        for command in ["copySelection", "scrollUp", "scrollDown"] {
            harness.run(command, None).unwrap();
        }
        assert!(harness.registry.is_empty());
        assert!(harness.journal().is_empty());
    }

    #[test]
    fn test_new_creates_and_activates() {
        let (harness, _) = Harness::with_instances(2);
        harness.run("new", None).unwrap();

        assert_eq!(harness.registry.len(), 3);
        assert_eq!(harness.registry.active_instance_index(), Some(2));
        assert!(harness.panel.is_focused());
    }

    #[test]
    fn test_focus_creates_when_empty() {
        let harness = Harness::new();
        harness.run("focus", None).unwrap();

        assert_eq!(harness.registry.len(), 1);
        assert!(harness.active().is_some());
        assert!(harness.panel.is_visible());
    }

    #[test]
    fn test_focus_reuses_active() {
        let (harness, instances) = Harness::with_instances(2);
        harness.registry.set_active_instance(&instances[1]);
        harness.run("focus", None).unwrap();

        assert_eq!(harness.registry.len(), 2);
        assert_eq!(harness.active().unwrap().id(), instances[1].id());
    }

    #[test]
    fn test_focus_next_previous_scenario() {
        let (harness, instances) = Harness::with_instances(3);
        let (a, b, c) = (instances[0].id(), instances[1].id(), instances[2].id());
        harness.registry.set_active_instance(&instances[1]);
        assert_eq!(harness.active().unwrap().id(), b);

        harness.run("focusNext", None).unwrap();
        assert_eq!(harness.active().unwrap().id(), c);
        harness.run("focusNext", None).unwrap();
        assert_eq!(harness.active().unwrap().id(), a);
        harness.run("focusPrevious", None).unwrap();
        assert_eq!(harness.active().unwrap().id(), c);
        assert!(harness.panel.is_focused());
    }

    #[test]
    fn test_focus_next_on_empty_still_shows_panel() {
        let harness = Harness::new();
        harness.run("focusNext", None).unwrap();
        assert!(harness.registry.is_empty());
        assert!(harness.panel.is_visible());
    }

    #[test]
    fn test_paste_creates_instance_when_empty() {
        let harness = Harness::new();
        harness.run("paste", None).unwrap();

        let d = harness.active().expect("paste creates an instance");
        assert_eq!(harness.registry.len(), 1);
        assert_eq!(
            harness.journal().ops_for(d.id()),
            vec![BackendOp::Spawned, BackendOp::Paste]
        );
    }

    #[test]
    fn test_paste_after_last_killed_recreates() {
        let (harness, instances) = Harness::with_instances(1);
        harness.run("kill", None).unwrap();
        harness.run("paste", None).unwrap();

        let fresh = harness.active().unwrap();
        assert_ne!(fresh.id(), instances[0].id());
        assert_eq!(harness.journal().ops_for(fresh.id()).last(), Some(&BackendOp::Paste));
    }

    #[test]
    fn test_run_selected_text_sends_whole_document_when_no_selection() {
        let harness = Harness::new();
        harness
            .editors
            .focus(Arc::new(BufferEditor::new("echo hi")));

        harness.run("runSelectedText", None).unwrap();

        let instance = harness.active().expect("run creates an instance");
        assert_eq!(
            harness.journal().ops_for(instance.id()).last(),
            Some(&BackendOp::SendText {
                text: "echo hi".to_string(),
                add_new_line: true,
            })
        );
    }

    #[test]
    fn test_run_selected_text_sends_selection_normalized() {
        let (harness, instances) = Harness::with_instances(1);
        harness.table.context().set_run_config(RunConfig {
            line_ending: LineEnding::CrLf,
            add_new_line: false,
        });
        let editor = Arc::new(BufferEditor::new("ls\r\npwd\nwhoami"));
        editor.select(Selection::new(0, 8));
        harness.editors.focus(editor);

        harness.run("runSelectedText", None).unwrap();
        assert_eq!(
            harness.journal().ops_for(instances[0].id()).last(),
            Some(&BackendOp::SendText {
                text: "ls\r\npwd\r\n".to_string(),
                add_new_line: false,
            })
        );
    }

    #[test]
    fn test_run_selected_text_requires_focused_editor() {
        let harness = Harness::new();
        let err = harness.run("runSelectedText", None).unwrap_err();
        assert!(matches!(err, TermDeckError::NoFocusedEditor));
        assert!(harness.registry.is_empty());
    }

    #[test]
    fn test_parse_switch_label() {
        assert_eq!(parse_switch_label("2: bash").unwrap(), 1);
        assert_eq!(parse_switch_label("1: a: b").unwrap(), 0);
        assert_eq!(parse_switch_label(" 10 : zsh").unwrap(), 9);
        assert_eq!(parse_switch_label("3").unwrap(), 2);
        assert!(matches!(
            parse_switch_label("bash: 2"),
            Err(TermDeckError::MalformedSwitchLabel(_))
        ));
        assert!(parse_switch_label("0: bash").is_err());
        assert!(parse_switch_label("").is_err());
    }

    #[test]
    fn test_switch_by_label() {
        let (harness, instances) = Harness::with_instances(3);
        harness.run("switchTerminalInstance", Some("2: bash")).unwrap();

        assert_eq!(harness.registry.active_instance_index(), Some(1));
        assert_eq!(harness.active().unwrap().id(), instances[1].id());
        assert!(harness.panel.is_focused());
    }

    #[test]
    fn test_switch_rejects_bad_input() {
        let (harness, _) = Harness::with_instances(2);
        assert!(matches!(
            harness.run("switchTerminalInstance", Some("x: bash")),
            Err(TermDeckError::MalformedSwitchLabel(_))
        ));
        assert!(matches!(
            harness.run("switchTerminalInstance", None),
            Err(TermDeckError::MalformedSwitchLabel(_))
        ));
        assert!(matches!(
            harness.run("switchTerminalInstance", Some("5: bash")),
            Err(TermDeckError::InvalidInstanceIndex { index: 4, len: 2 })
        ));
        assert_eq!(harness.registry.active_instance_index(), Some(0));
    }

    #[test]
    fn test_backend_failure_propagates() {
        let harness = Harness::new();
        harness.factory.set_fail_spawns(true);
        assert!(matches!(
            harness.run("new", None),
            Err(TermDeckError::Backend(_))
        ));
        assert!(matches!(
            harness.run("paste", None),
            Err(TermDeckError::Backend(_))
        ));
        assert!(harness.registry.is_empty());
    }

    #[test]
    fn test_ignored_task_still_shows_panel() {
        let harness = Harness::new();
        drop(harness.table.run("new", None).unwrap());
        assert_eq!(harness.registry.len(), 1);
        assert!(harness.panel.is_visible());
        assert!(harness.panel.is_focused());

        let _ = harness.table.run("toggleTerminal", None).unwrap();
        assert!(!harness.panel.is_visible());

        for command in ["focus", "focusNext", "focusPrevious"] {
            let _ = harness.table.run(command, None).unwrap();
            assert!(harness.panel.is_visible(), "{} left the panel hidden", command);
            let _ = harness.table.run("toggleTerminal", None).unwrap();
        }

        harness.registry.create_instance().unwrap();
        let _ = harness.table.run("switchTerminalInstance", Some("2: x")).unwrap();
        assert!(harness.panel.is_visible());
        assert_eq!(harness.registry.active_instance_index(), Some(1));

        let _ = harness.table.run("toggleTerminal", None).unwrap();
        let _ = harness.table.run("kill", None).unwrap();
        assert!(harness.panel.is_visible());
    }

    #[test]
    fn test_search_by_label() {
        let harness = Harness::new();
        assert_eq!(
            harness.table.search("focus next"),
            vec![CommandId::FocusNext]
        );
        assert_eq!(
            harness.table.search("Scroll"),
            vec![CommandId::ScrollDown, CommandId::ScrollUp]
        );
        assert_eq!(harness.table.search("").len(), CommandId::ALL.len());
        assert!(harness.table.search("zzz").is_empty());
    }

    #[test]
    fn test_labels() {
        assert_eq!(CommandId::Kill.panel_label(), Some("Kill Terminal"));
        assert_eq!(CommandId::New.panel_label(), Some("New Terminal"));
        assert_eq!(CommandId::Paste.panel_label(), None);
        assert_eq!(CommandId::ToggleTerminal.label(), "Toggle Integrated Terminal");
    }

    #[test]
    fn test_fuzzy_match() {
        assert!(fuzzy_match("Toggle Integrated Terminal", "tit"));
        assert!(!fuzzy_match("Scroll Up", "pu"));
    }
}
