//! Command handler modules for the `tt` binary.

pub mod import;
pub mod progress;
