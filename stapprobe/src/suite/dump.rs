use std::io::{Stderr, Write};
use tracing::error;

use stapprobe_process::InvocationResult;

/// Writes a run's captured stdout/stderr to `sink` when the scope holding
/// it fails.
///
/// Dropping the guard during a panic (a failed `assert!`) fires it; a failing
/// `Result` fires it through [`with_failure_dump`]. Success never does.
pub struct FailureDump<'a, W: Write> {
    label: &'a str,
    result: &'a InvocationResult,
    sink: W,
    armed: bool,
}

impl<'a> FailureDump<'a, Stderr> {
    pub fn new(label: &'a str, result: &'a InvocationResult) -> Self {
        Self::with_sink(label, result, std::io::stderr())
    }
}

impl<'a, W: Write> FailureDump<'a, W> {
    pub fn with_sink(label: &'a str, result: &'a InvocationResult, sink: W) -> Self {
        Self {
            label,
            result,
            sink,
            armed: true,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "[{}] exit status: {}\nstdout: {}\nstderr: {}\n",
            self.label,
            self.result.status,
            self.result.stdout_lossy(),
            self.result.stderr_lossy()
        )
    }

    /// Emit once; later calls and the drop are no-ops.
    pub fn fire(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        error!("[{}] check failed, dumping captured output", self.label);
        let text = self.render();
        let _ = self.sink.write_all(text.as_bytes());
        let _ = self.sink.flush();
    }
}

impl<W: Write> Drop for FailureDump<'_, W> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.fire();
        }
    }
}

/// Run `checks` under `guard`, dumping on `Err` as well as on panic.
pub fn with_failure_dump<T, E, W, F>(mut guard: FailureDump<'_, W>, checks: F) -> Result<T, E>
where
    W: Write,
    F: FnOnce() -> Result<T, E>,
{
    let outcome = checks();
    if outcome.is_err() {
        guard.fire();
    }
    outcome
}
