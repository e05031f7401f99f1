//! Built-in heartbeat runnable.
//!
//! `HeartbeatModule` binds a [`HeartbeatRunnable`] that ticks on a fixed
//! interval for as long as the host runs. It doubles as a liveness signal
//! in the log and as a reference for writing runnables that own a
//! background task.
//!
//! Module options:
//!
//! ```json
//! { "interval_ms": 30000, "name": "Heartbeat" }
//! ```

mod service;

pub use service::{HeartbeatModule, HeartbeatRunnable, DEFAULT_INTERVAL_MS, MIN_INTERVAL_MS};
