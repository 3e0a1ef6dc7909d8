//! Utilities for SchemaMap

pub mod logging;

pub use logging::init_logging;
