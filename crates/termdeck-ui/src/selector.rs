use crate::commands::{CommandId, CommandTable};
use crate::panel::PanelTask;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use termdeck_core::{Result, TermDeckError};
use termdeck_terminal::{Subscription, TerminalRegistry};
use tracing::debug;

/// What the selector currently displays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorView {
    pub labels: Vec<String>,
    pub selected: Option<usize>,
    /// Bumped on every re-sync.
    pub revision: u64,
}

/// The three registry subscriptions, released together.
struct Binding {
    _instances: Subscription,
    _active: Subscription,
    _titles: Subscription,
}

/// Drop-down of terminal instances kept in sync with the registry.
///
/// Every registry event triggers a full re-read of labels and active index.
/// The selector never mutates the registry itself; choosing an entry runs the
/// switch command.
pub struct InstanceSelector {
    view: Arc<Mutex<SelectorView>>,
    binding: Option<Binding>,
}

fn resync(registry: &TerminalRegistry, view: &Mutex<SelectorView>) {
    let labels = registry.instance_labels();
    let selected = registry.active_instance_index();
    let mut view = view.lock();
    view.labels = labels;
    view.selected = selected;
    view.revision += 1;
}

impl InstanceSelector {
    pub fn new(registry: &Arc<TerminalRegistry>) -> Self {
        let view = Arc::new(Mutex::new(SelectorView::default()));
        resync(registry, &view);

        let refresh = {
            let registry: Weak<TerminalRegistry> = Arc::downgrade(registry);
            let view = Arc::downgrade(&view);
            move || {
                if let (Some(registry), Some(view)) = (registry.upgrade(), view.upgrade()) {
                    resync(&registry, &view);
                }
            }
        };

        let binding = Binding {
            _instances: registry.on_instances_changed({
                let refresh = refresh.clone();
                move |_| refresh()
            }),
            _active: registry.on_active_instance_changed({
                let refresh = refresh.clone();
                move |_| refresh()
            }),
            _titles: registry.on_instance_title_changed(move |_| refresh()),
        };

        Self {
            view,
            binding: Some(binding),
        }
    }

    pub fn view(&self) -> SelectorView {
        self.view.lock().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.view.lock().labels.clone()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.view.lock().selected
    }

    pub fn selected_label(&self) -> Option<String> {
        let view = self.view.lock();
        view.selected.and_then(|i| view.labels.get(i).cloned())
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Stop listening to the registry. The last view stays readable.
    pub fn dispose(&mut self) {
        if self.binding.take().is_some() {
            debug!("Instance selector unbound");
        }
    }

    /// The user picked `label` from the list.
    pub fn choose(&self, commands: &CommandTable, label: &str) -> Result<PanelTask> {
        commands.execute(CommandId::SwitchTerminalInstance, Some(label))
    }

    /// The user picked the entry at `index` (zero-based).
    pub fn choose_index(&self, commands: &CommandTable, index: usize) -> Result<PanelTask> {
        let label = {
            let view = self.view.lock();
            view.labels
                .get(index)
                .cloned()
                .ok_or(TermDeckError::InvalidInstanceIndex {
                    index,
                    len: view.labels.len(),
                })?
        };
        self.choose(commands, &label)
    }
}
