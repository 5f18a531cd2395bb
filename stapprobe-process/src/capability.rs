use tracing::{info, warn};

use stapprobe_script::{trivial_script, TRIVIAL_EXPECTED_STDOUT};

use crate::tracer::Tracer;
use crate::util::privilege_hint;

/// No-op command the smoke test traces
pub const SMOKE_TEST_COMMAND: &str = "true";

/// Outcome of probing the tracer before anything depends on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// `stap` starts and runs the smoke-test script
    Available { version: String },
    /// `stap` could not be started at all
    Unavailable { reason: String },
    /// `stap` starts but cannot run scripts here (privileges, kernel support)
    NonFunctional { reason: String, stderr: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available { .. })
    }
}

/// Version query followed by the smoke test.
pub async fn probe_tracer(tracer: &Tracer) -> Availability {
    let version = match tracer.version().await {
        Ok(version) => version,
        Err(e) => {
            warn!("Tracer version query failed: {}", e);
            return Availability::Unavailable {
                reason: format!("Couldn't find {} on the path: {}", tracer.binary().display(), e),
            };
        }
    };
    info!("Found tracer: {}", version);

    let result = match tracer.invoke(&trivial_script(), SMOKE_TEST_COMMAND).await {
        Ok(result) => result,
        Err(e) => {
            return Availability::Unavailable {
                reason: format!("Smoke test could not run: {}", e),
            }
        }
    };

    if smoke_test_output_matches(&result.stdout) {
        info!("✓ Smoke test passed");
        return Availability::Available { version };
    }

    let mut reason = format!(
        "Test systemtap script did not run (stdout was {:?})",
        result.stdout_lossy()
    );
    if let Some(hint) = privilege_hint() {
        reason.push_str("; ");
        reason.push_str(hint);
    }
    warn!("{}", reason);
    Availability::NonFunctional {
        reason,
        stderr: result.stderr_lossy(),
    }
}

/// Exact match, tolerating a missing trailing newline.
pub fn smoke_test_output_matches(stdout: &[u8]) -> bool {
    let expected = TRIVIAL_EXPECTED_STDOUT.as_bytes();
    stdout == expected || stdout == expected.strip_suffix(b"\n").unwrap_or(expected)
}
