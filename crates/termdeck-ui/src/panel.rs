use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::Arc;
use termdeck_core::Result;
use tracing::debug;

/// Completion of a panel operation. The request is applied when it is
/// issued; dropping the task without awaiting it is allowed.
pub type PanelTask = BoxFuture<'static, Result<()>>;

/// Shows and hides the panel hosting the terminals.
pub trait PanelController: Send + Sync {
    fn show_panel(&self, take_focus: bool) -> PanelTask;
    fn toggle_panel(&self) -> PanelTask;
    fn is_visible(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelState {
    pub visible: bool,
    pub focused: bool,
}

#[derive(Debug, Clone, Copy)]
enum PanelRequest {
    Show { take_focus: bool },
    Toggle,
}

struct PanelInner {
    state: PanelState,
    /// Sequence number of the most recently applied request.
    applied: u64,
}

/// Panel controller with no real window behind it.
///
/// Requests are applied in issue order as soon as they are made, so the last
/// request issued always wins. The returned task resolves immediately.
#[derive(Clone)]
pub struct HeadlessPanel {
    inner: Arc<Mutex<PanelInner>>,
}

impl HeadlessPanel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PanelInner {
                state: PanelState::default(),
                applied: 0,
            })),
        }
    }

    pub fn state(&self) -> PanelState {
        self.inner.lock().state
    }

    pub fn is_focused(&self) -> bool {
        self.inner.lock().state.focused
    }

    fn apply(&self, request: PanelRequest) -> PanelTask {
        {
            let mut inner = self.inner.lock();
            inner.applied += 1;
            let state = &mut inner.state;
            match request {
                PanelRequest::Show { take_focus } => {
                    state.visible = true;
                    state.focused |= take_focus;
                }
                PanelRequest::Toggle => {
                    state.visible = !state.visible;
                    state.focused = state.visible;
                }
            }
            debug!("Panel #{} applied: {:?}", inner.applied, inner.state);
        }
        future::ready(Ok(())).boxed()
    }
}

impl Default for HeadlessPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelController for HeadlessPanel {
    fn show_panel(&self, take_focus: bool) -> PanelTask {
        self.apply(PanelRequest::Show { take_focus })
    }

    fn toggle_panel(&self) -> PanelTask {
        self.apply(PanelRequest::Toggle)
    }

    fn is_visible(&self) -> bool {
        self.inner.lock().state.visible
    }
}
