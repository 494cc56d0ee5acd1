pub mod event;
pub mod headless;
pub mod instance;
pub mod registry;

pub use event::{EventEmitter, Subscription};
pub use instance::{
    InstanceHandle, LaunchOptions, TerminalBackend, TerminalBackendFactory, TerminalInstance,
};
pub use registry::{ActiveInstanceChanged, InstanceTitleChanged, InstancesChanged, TerminalRegistry};
