//! stapprobe: checks that a runtime's SystemTap static markers work by
//! tracing it under `stap` and matching the output.

pub mod config;
pub mod logging;
pub mod suite;
