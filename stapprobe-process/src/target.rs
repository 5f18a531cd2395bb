use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use stapprobe_script::TracerScript;

use crate::error::Result;
use crate::invocation::{Invocation, InvocationResult};
use crate::tracer::Tracer;
use crate::util::shell_quote;

pub const DEFAULT_LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// What the traced runtime should execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    /// `<runtime> -c <code>`
    Inline(String),
    /// `<runtime> <path>`
    File(PathBuf),
}

/// The runtime executable whose markers are under test.
#[derive(Debug, Clone)]
pub struct RuntimeTarget {
    executable: PathBuf,
    library_path_var: String,
}

impl RuntimeTarget {
    pub fn new<P: AsRef<Path>>(executable: P) -> Self {
        Self {
            executable: executable.as_ref().to_path_buf(),
            library_path_var: DEFAULT_LIBRARY_PATH_VAR.to_string(),
        }
    }

    pub fn with_library_path_var(mut self, name: impl Into<String>) -> Self {
        self.library_path_var = name.into();
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn library_path_var(&self) -> &str {
        &self.library_path_var
    }

    pub fn command_line(&self, source: &TargetSource) -> String {
        let runtime = shell_quote(&self.executable.to_string_lossy());
        match source {
            TargetSource::Inline(code) => format!("{} -c {}", runtime, shell_quote(code)),
            TargetSource::File(path) => {
                format!("{} {}", runtime, shell_quote(&path.to_string_lossy()))
            }
        }
    }

    /// The library search path to re-export, taken from this process's
    /// environment. Unset and empty values are both ignored.
    pub fn forwarded_env(&self) -> BTreeMap<String, String> {
        self.forwarded_env_with(|name| std::env::var_os(name))
    }

    /// The `stap -c` command line is a UTF-8 string, so a value that is not
    /// valid UTF-8 cannot be spelled into it and is dropped with a warning.
    pub fn forwarded_env_with<F>(&self, lookup: F) -> BTreeMap<String, String>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut env = BTreeMap::new();
        let Some(raw) = lookup(&self.library_path_var).filter(|v| !v.is_empty()) else {
            return env;
        };
        match raw.into_string() {
            Ok(value) => {
                debug!("Forwarding {}={} to traced runtime", self.library_path_var, value);
                env.insert(self.library_path_var.clone(), value);
            }
            Err(raw) => warn!(
                "Not forwarding {}: value {:?} is not valid UTF-8",
                self.library_path_var, raw
            ),
        }
        env
    }

    pub fn invocation(&self, script: TracerScript, source: &TargetSource) -> Invocation {
        let mut invocation = Invocation::new(script, self.command_line(source));
        invocation.env = self.forwarded_env();
        invocation
    }
}

/// Run the runtime on `source` under `tracer` with `script` attached.
pub async fn invoke_traced_target(
    tracer: &Tracer,
    target: &RuntimeTarget,
    script: &TracerScript,
    source: &TargetSource,
) -> Result<InvocationResult> {
    let invocation = target.invocation(script.clone(), source);
    tracer.run(&invocation).await
}
