//! Utils module - process-level helpers for the binary

pub mod logging;
