//! Shared utilities for trustgate.

pub mod logging;

pub use logging::{init_logging, LogFormat};
