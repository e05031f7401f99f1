//! apphost - application host for modules and runnables
//!
//! A [`Host`] bootstraps configuration and logging, runs every registered
//! [`Module`] once to wire the object graph ([`Container`]), then drives
//! the [`Runnable`]s the modules bound through a coordinated start and
//! stop sequence with per-component failure isolation.

pub mod config;
pub mod container;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod host;
pub mod lifecycle;
pub mod log;
pub mod module;
pub mod runnable;
pub mod utils;

pub use config::{ConfigBuilder, ConfigView, RootConfig, ScopedConfig};
pub use container::Container;
pub use error::{HostError, LifecycleError, Result};
pub use events::{LifecycleEvent, LifecyclePhase};
pub use host::Host;
pub use log::{LogFactory, LogLevel, Logger};
pub use module::{Module, ModuleEntry, ModuleFn, ModuleRegistry};
pub use runnable::{Runnable, RunnableEntry, RunnableRegistry};
