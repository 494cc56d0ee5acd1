use crate::event::{EventEmitter, Subscription};
use crate::instance::{InstanceHandle, LaunchOptions, TerminalBackendFactory, TerminalInstance};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use termdeck_core::{InstanceId, Result, TermDeckError};
use tracing::{debug, info};
use uuid::Uuid;

/// Membership of the instance list changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstancesChanged {
    Added(InstanceId),
    Removed(InstanceId),
}

/// The active instance changed identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveInstanceChanged {
    pub previous: Option<InstanceId>,
    pub current: Option<InstanceId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceTitleChanged {
    pub id: InstanceId,
    pub title: String,
}

struct Entry {
    instance: InstanceHandle,
    _subscriptions: [Subscription; 2],
}

struct RegistryState {
    entries: Vec<Entry>,
    /// `None` iff `entries` is empty.
    active: Option<usize>,
    launch: LaunchOptions,
}

impl RegistryState {
    fn id_at(&self, index: Option<usize>) -> Option<InstanceId> {
        index
            .and_then(|i| self.entries.get(i))
            .map(|e| e.instance.id())
    }

    fn position(&self, id: InstanceId) -> Option<usize> {
        self.entries.iter().position(|e| e.instance.id() == id)
    }
}

/// Owns the ordered set of terminal instances and the active pointer.
///
/// All three events are dispatched after the internal lock is released, so
/// listeners are free to query the registry.
pub struct TerminalRegistry {
    this: Weak<TerminalRegistry>,
    factory: Arc<dyn TerminalBackendFactory>,
    state: Mutex<RegistryState>,
    instances_changed: EventEmitter<InstancesChanged>,
    active_instance_changed: EventEmitter<ActiveInstanceChanged>,
    instance_title_changed: EventEmitter<InstanceTitleChanged>,
}

impl TerminalRegistry {
    pub fn new(factory: Arc<dyn TerminalBackendFactory>, launch: LaunchOptions) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            factory,
            state: Mutex::new(RegistryState {
                entries: Vec::new(),
                active: None,
                launch,
            }),
            instances_changed: EventEmitter::new(),
            active_instance_changed: EventEmitter::new(),
            instance_title_changed: EventEmitter::new(),
        })
    }

    /// Options used for instances created from now on.
    pub fn set_launch_options(&self, launch: LaunchOptions) {
        self.state.lock().launch = launch;
    }

    pub fn launch_options(&self) -> LaunchOptions {
        self.state.lock().launch.clone()
    }

    /// Spawn a new instance and append it to the list.
    ///
    /// The active pointer is left alone unless the list was empty, in which
    /// case the new instance becomes active.
    pub fn create_instance(&self) -> Result<InstanceHandle> {
        let launch = self.launch_options();
        let id = Uuid::new_v4();
        let backend = self.factory.spawn(id, &launch)?;
        let instance = Arc::new(TerminalInstance::new(id, launch.title.clone(), backend));

        let on_disposed = {
            let registry = self.this.clone();
            instance.on_disposed(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.remove_instance(id);
                }
            })
        };
        let on_title = {
            let registry = self.this.clone();
            instance.on_title_changed(move |title| {
                if let Some(registry) = registry.upgrade() {
                    registry.instance_title_changed.emit(&InstanceTitleChanged {
                        id,
                        title: title.to_string(),
                    });
                }
            })
        };

        let became_active = {
            let mut state = self.state.lock();
            state.entries.push(Entry {
                instance: instance.clone(),
                _subscriptions: [on_disposed, on_title],
            });
            if state.active.is_none() {
                state.active = Some(state.entries.len() - 1);
                true
            } else {
                false
            }
        };

        info!("Created terminal instance {} ({})", id, launch.title);
        self.instances_changed.emit(&InstancesChanged::Added(id));
        if became_active {
            self.active_instance_changed.emit(&ActiveInstanceChanged {
                previous: None,
                current: Some(id),
            });
        }
        Ok(instance)
    }

    /// Drop a disposed instance from the list, re-homing the active pointer
    /// to its predecessor (or to the new first instance when it was first).
    fn remove_instance(&self, id: InstanceId) {
        let (entry, active_change) = {
            let mut state = self.state.lock();
            let Some(pos) = state.position(id) else {
                return;
            };
            let entry = state.entries.remove(pos);
            let was_active = state.active == Some(pos);

            let next_active = match state.active {
                _ if state.entries.is_empty() => None,
                Some(active) if active == pos => Some(pos.saturating_sub(1)),
                Some(active) if active > pos => Some(active - 1),
                other => other,
            };
            state.active = next_active;

            let change = was_active.then(|| ActiveInstanceChanged {
                previous: Some(id),
                current: state.id_at(state.active),
            });
            (entry, change)
        };
        drop(entry);

        info!("Removed terminal instance {}", id);
        self.instances_changed.emit(&InstancesChanged::Removed(id));
        if let Some(change) = active_change {
            debug!("Active terminal re-homed to {:?}", change.current);
            self.active_instance_changed.emit(&change);
        }
    }

    /// Move the active pointer to whatever `pick` returns. Emits only when
    /// the active instance actually changes.
    fn update_active(&self, pick: impl FnOnce(&RegistryState) -> Option<usize>) -> bool {
        let change = {
            let mut state = self.state.lock();
            let Some(target) = pick(&*state) else {
                return false;
            };
            if state.active == Some(target) || target >= state.entries.len() {
                return false;
            }
            let previous = state.id_at(state.active);
            state.active = Some(target);
            ActiveInstanceChanged {
                previous,
                current: state.id_at(state.active),
            }
        };

        debug!("Active terminal {:?} -> {:?}", change.previous, change.current);
        self.active_instance_changed.emit(&change);
        true
    }

    pub fn active_instance(&self) -> Option<InstanceHandle> {
        let state = self.state.lock();
        state
            .active
            .and_then(|i| state.entries.get(i))
            .map(|e| e.instance.clone())
    }

    pub fn active_instance_index(&self) -> Option<usize> {
        self.state.lock().active
    }

    /// Make `instance` active.
    ///
    /// Handles that are not (or no longer) in the list are rejected silently:
    /// nothing changes, nothing is emitted, and `false` is returned.
    pub fn set_active_instance(&self, instance: &TerminalInstance) -> bool {
        let id = instance.id();
        let member = self.state.lock().position(id).is_some();
        if !member {
            debug!("Ignoring request to activate unknown terminal {}", id);
            return false;
        }
        self.update_active(|state| state.position(id));
        true
    }

    pub fn set_active_instance_by_index(&self, index: usize) -> Result<()> {
        let len = self.len();
        if index >= len {
            return Err(TermDeckError::InvalidInstanceIndex { index, len });
        }
        self.update_active(|_| Some(index));
        Ok(())
    }

    /// Advance the active pointer, wrapping from the last instance to the first.
    pub fn set_active_instance_to_next(&self) {
        self.update_active(|state| {
            let len = state.entries.len();
            state.active.map(|active| (active + 1) % len)
        });
    }

    /// Retreat the active pointer, wrapping from the first instance to the last.
    pub fn set_active_instance_to_previous(&self) {
        self.update_active(|state| {
            let len = state.entries.len();
            state.active.map(|active| (active + len - 1) % len)
        });
    }

    pub fn instances(&self) -> Vec<InstanceHandle> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|e| e.instance.clone())
            .collect()
    }

    pub fn instance(&self, id: InstanceId) -> Option<InstanceHandle> {
        let state = self.state.lock();
        state.position(id).map(|i| state.entries[i].instance.clone())
    }

    /// Selector labels, `"<n>: <title>"` with `n` starting at 1.
    pub fn instance_labels(&self) -> Vec<String> {
        self.state
            .lock()
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}: {}", i + 1, e.instance.title()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Dispose every instance, last first.
    pub fn dispose_all(&self) {
        let instances = self.instances();
        info!("Disposing {} terminal instances", instances.len());
        for instance in instances.into_iter().rev() {
            instance.dispose();
        }
    }

    /// Listeners currently subscribed to any of the three registry events.
    pub fn listener_count(&self) -> usize {
        self.instances_changed.listener_count()
            + self.active_instance_changed.listener_count()
            + self.instance_title_changed.listener_count()
    }

    pub fn on_instances_changed(
        &self,
        listener: impl Fn(&InstancesChanged) + Send + Sync + 'static,
    ) -> Subscription {
        self.instances_changed.subscribe(listener)
    }

    pub fn on_active_instance_changed(
        &self,
        listener: impl Fn(&ActiveInstanceChanged) + Send + Sync + 'static,
    ) -> Subscription {
        self.active_instance_changed.subscribe(listener)
    }

    pub fn on_instance_title_changed(
        &self,
        listener: impl Fn(&InstanceTitleChanged) + Send + Sync + 'static,
    ) -> Subscription {
        self.instance_title_changed.subscribe(listener)
    }
}
