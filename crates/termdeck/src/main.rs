mod console;

use anyhow::Result;
use console::{ConsoleLine, HELP};
use std::sync::Arc;
use termdeck_core::config::{AppConfig, ConfigWatcher};
use termdeck_terminal::headless::{BackendOp, HeadlessBackendFactory, Journal};
use termdeck_terminal::{LaunchOptions, TerminalRegistry};
use termdeck_ui::{
    BufferEditor, CommandContext, CommandId, CommandTable, FocusedEditor, HeadlessPanel,
    InstanceSelector, PanelController, Selection,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = AppConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_filter)),
        )
        .init();

    tracing::info!("Starting TermDeck v{}", termdeck_core::VERSION);
    if let Err(e) = &loaded {
        tracing::warn!("Failed to load config, using defaults: {}", e);
    }

    let factory = Arc::new(HeadlessBackendFactory::new());
    let journal = factory.journal();
    let registry = TerminalRegistry::new(factory, LaunchOptions::from(&config.terminal));
    let panel = HeadlessPanel::new();
    let scratch = Arc::new(BufferEditor::default());
    let editors = Arc::new(FocusedEditor::new());
    editors.focus(scratch.clone());

    let commands = Arc::new(CommandTable::new(CommandContext::new(
        registry.clone(),
        Arc::new(panel.clone()),
        editors,
        config.run.clone(),
    )));
    let mut selector = InstanceSelector::new(&registry);

    // Hot-reload launch and run settings when the config file changes
    let mut watcher = ConfigWatcher::new();
    {
        let registry = registry.clone();
        let commands = commands.clone();
        let path = watcher.config_path().to_path_buf();
        if let Err(e) = watcher.start(move || match AppConfig::load_from(&path) {
            Ok(config) => {
                registry.set_launch_options(LaunchOptions::from(&config.terminal));
                commands.context().set_run_config(config.run);
                tracing::info!("Reloaded config from {}", path.display());
            }
            Err(e) => tracing::warn!("Ignoring invalid config change: {}", e),
        }) {
            tracing::warn!("Config hot-reload disabled: {}", e);
        }
    }

    println!("TermDeck {}: type :help for usage", termdeck_core::VERSION);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match ConsoleLine::parse(&line) {
            ConsoleLine::Empty => {}
            ConsoleLine::Command { name, arg } => {
                match commands.run(&name, arg.as_deref()) {
                    Ok(task) => {
                        if let Err(e) = task.await {
                            println!("panel error: {}", e);
                        }
                    }
                    Err(e) => println!("error: {}", e),
                }
                print_journal(&journal);
                print_selector(&selector, &panel);
            }
            ConsoleLine::Buffer(text) => scratch.set_text(&text),
            ConsoleLine::Select { anchor, head } => {
                scratch.select(Selection::new(anchor, head));
            }
            ConsoleLine::Title(title) => match registry.active_instance() {
                Some(instance) => {
                    instance.set_title(title);
                    print_selector(&selector, &panel);
                }
                None => println!("no active terminal"),
            },
            ConsoleLine::List => {
                print_selector(&selector, &panel);
                print_instances(&registry);
            }
            ConsoleLine::Commands(query) => {
                for id in commands.search(query.as_deref().unwrap_or_default()) {
                    print_command(id);
                }
            }
            ConsoleLine::Help => println!("{}", HELP),
            ConsoleLine::Quit => break,
            ConsoleLine::Invalid(message) => println!("{}", message),
        }
    }

    selector.dispose();
    registry.dispose_all();
    drop(watcher);
    tracing::info!("TermDeck stopped");

    Ok(())
}

fn print_journal(journal: &Journal) {
    for entry in journal.drain() {
        let short = entry.instance.simple().to_string();
        let op = match entry.op {
            BackendOp::SendText { text, add_new_line } => {
                format!("send {:?}{}", text, if add_new_line { " ⏎" } else { "" })
            }
            other => format!("{:?}", other),
        };
        println!("  [{}] {}", &short[..8], op);
    }
}

fn print_selector(selector: &InstanceSelector, panel: &HeadlessPanel) {
    let view = selector.view();
    let visibility = if panel.is_visible() { "shown" } else { "hidden" };
    if view.labels.is_empty() {
        println!("  (no terminals, panel {})", visibility);
        return;
    }
    for (i, label) in view.labels.iter().enumerate() {
        let marker = if view.selected == Some(i) { '*' } else { ' ' };
        println!("  {} {}", marker, label);
    }
    println!("  panel {}", visibility);
}

fn print_instances(registry: &TerminalRegistry) {
    for instance in registry.instances() {
        println!(
            "  {}  started {}",
            &instance.id().simple().to_string()[..8],
            instance.created_at().format("%H:%M:%S")
        );
    }
}

fn print_command(id: CommandId) {
    match id.panel_label() {
        Some(short) => println!("  {:<24} {} ({})", id.id(), id.label(), short),
        None => println!("  {:<24} {}", id.id(), id.label()),
    }
}
