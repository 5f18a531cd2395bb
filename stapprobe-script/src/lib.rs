//! SystemTap script building blocks for stapprobe.
//!
//! - [`TracerScript`]: the immutable bytes piped to `stap` on stdin
//! - [`ProbePrefix`]: the `process(...)` / `process(...).library(...)` addressing
//!   expression that locates a runtime's static markers
//! - [`ScriptTemplate`]: a script body with a single prefix substitution point

pub mod error;
pub mod prefix;
pub mod script;
pub mod template;

pub use error::{Result, ScriptError};
pub use prefix::{quote_string_literal, LinkMode, ProbePrefix};
pub use script::{println_on_begin, trivial_script, TracerScript, TRIVIAL_EXPECTED_STDOUT};
pub use template::{hierarchy_script, ScriptTemplate, HIERARCHY_TEMPLATE, PREFIX_PLACEHOLDER};
