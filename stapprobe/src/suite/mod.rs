//! The marker suite: a one-time gate followed by independent cases.

pub mod cases;
pub mod dump;
pub mod expect;
pub mod gate;
pub mod harness;
pub mod report;

pub use cases::{CaseOutcome, SourceFixture, SuiteCase};
pub use dump::{with_failure_dump, FailureDump};
pub use expect::{expect_contains, expect_in_order, parse_trace_lines, ExpectedLine, TraceLine};
pub use gate::{HarnessSettings, SkipReason, SuiteGate};
pub use harness::ProbeHarness;
pub use report::{CaseReport, CaseStatus, SuiteReport};

use std::time::Instant;
use tracing::{error, info, warn};

use stapprobe_process::ProcessError;

/// Why a case failed
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("Expected {expected:?} in traced output")]
    AssertionMismatch { expected: String },

    #[error("Expected trace lines in order; {missing:?} not found after the first {matched}")]
    OutOfOrder { missing: String, matched: usize },

    #[error("Traced output is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Failed to prepare source file: {0}")]
    Io(#[from] std::io::Error),
}

/// Run `cases` one after another against an opened gate.
pub async fn run_cases(harness: &ProbeHarness, cases: &[SuiteCase]) -> SuiteReport {
    let mut report = SuiteReport {
        tracer_version: Some(harness.tracer_version().to_string()),
        probe_prefix: Some(harness.prefix().to_string()),
        ..SuiteReport::default()
    };

    for case in cases {
        let started = Instant::now();
        let (status, detail) = match case.run(harness).await {
            Ok(CaseOutcome::Passed) => {
                info!("✓ {} passed", case.name());
                (CaseStatus::Passed, None)
            }
            Ok(CaseOutcome::Skipped(reason)) => {
                warn!("{} skipped: {}", case.name(), reason);
                (CaseStatus::Skipped, Some(reason))
            }
            Err(e) => {
                error!("✗ {} failed: {}", case.name(), e);
                (CaseStatus::Failed, Some(e.to_string()))
            }
        };
        report.cases.push(CaseReport {
            name: case.name().to_string(),
            status,
            detail,
            duration_ms: started.elapsed().as_millis(),
        });
    }

    report
}

/// Open the gate and run `cases`, or report the whole suite as skipped.
pub async fn run_suite(
    settings: &HarnessSettings,
    cases: &[SuiteCase],
) -> Result<SuiteReport, ProcessError> {
    match SuiteGate::open(settings).await? {
        SuiteGate::Ready(harness) => Ok(run_cases(&harness, cases).await),
        SuiteGate::Skip(reason) => Ok(SuiteReport::skipped(reason.to_string())),
    }
}
