//! Driving `stap` and the traced runtime as child processes.
//!
//! Everything here is a single blocking round trip per call: spawn, feed
//! stdin, wait for exit, hand back the complete stdout/stderr.

pub mod capability;
pub mod error;
pub mod invocation;
pub mod runtime;
pub mod target;
pub mod tracer;
pub mod util;

pub use capability::{probe_tracer, Availability};
pub use error::{ProcessError, Result};
pub use invocation::{Invocation, InvocationResult};
pub use runtime::{resolve_probe_prefix, RuntimeBuildInfo};
pub use target::{invoke_traced_target, RuntimeTarget, TargetSource, DEFAULT_LIBRARY_PATH_VAR};
pub use tracer::{Tracer, DEFAULT_VERBOSITY};
