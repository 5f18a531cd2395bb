use std::collections::BTreeMap;
use std::process::ExitStatus;
use std::str::Utf8Error;

use stapprobe_script::TracerScript;

use crate::util::shell_quote;

/// One tracer run: the script for stdin, the command `stap -c` traces, and
/// environment overrides for that command.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub script: TracerScript,
    pub command: String,
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(script: TracerScript, command: impl Into<String>) -> Self {
        Self {
            script,
            command: command.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// The string handed to `stap -c`.
    ///
    /// Overrides are spelled out through `env(1)` in the command itself:
    /// stap reaches the traced command via a setuid helper that scrubs
    /// variables such as `LD_LIBRARY_PATH` from its own environment.
    pub fn command_line(&self) -> String {
        if self.env.is_empty() {
            return self.command.clone();
        }
        let assignments: Vec<String> = self
            .env
            .iter()
            .map(|(name, value)| shell_quote(&format!("{name}={value}")))
            .collect();
        format!("env {} {}", assignments.join(" "), self.command)
    }
}

/// Everything a finished tracer run produced.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: ExitStatus,
}

impl InvocationResult {
    pub fn stdout_utf8(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.stdout)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }
}
