//! Configuration management for stapprobe
//!
//! Configuration priority (highest to lowest):
//! 1. Command line arguments
//! 2. --config specified file
//! 3. ~/.stapprobe/config.toml
//! 4. ./stapprobe.toml

pub mod args;
pub mod merged;
pub mod settings;

pub use args::{Args, ParsedArgs, ReportFormat};
pub use merged::MergedConfig;
pub use settings::{Config, LogLevel};
