use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use stapprobe_process::InvocationResult;
use stapprobe_script::println_on_begin;

use crate::suite::dump::{with_failure_dump, FailureDump};
use crate::suite::expect::{expect_contains, expect_in_order, ExpectedLine};
use crate::suite::harness::ProbeHarness;
use crate::suite::CaseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    Skipped(String),
}

/// A source file the runtime executes under the hierarchy script, with the
/// line numbers its markers report.
#[derive(Debug, Clone, Copy)]
pub struct SourceFixture {
    pub file_suffix: &'static str,
    pub body: &'static str,
    pub function: &'static str,
    /// Reported by the module entry and the function entry
    pub def_line: u32,
    /// Reported by the function return
    pub last_line: u32,
    /// Reported by the module return
    pub call_line: u32,
}

impl SourceFixture {
    /// Write the body to a fresh temp file. The file is removed when the
    /// handle drops, whichever way the case ends.
    pub fn materialize(&self) -> std::io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("stapprobe_")
            .suffix(self.file_suffix)
            .tempfile()?;
        file.write_all(self.body.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    pub fn expected_lines(&self, file: &str) -> Vec<ExpectedLine> {
        vec![
            ExpectedLine::entry("<module>", file, self.def_line),
            ExpectedLine::entry(self.function, file, self.def_line),
            ExpectedLine::exit(self.function, file, self.last_line),
            ExpectedLine::exit("<module>", file, self.call_line),
        ]
    }
}

pub const NON_ASCII_FUNCTION_FIXTURE: SourceFixture = SourceFixture {
    file_suffix: ".py",
    body: "
# Sample script with a non-ASCII function name
# Implicitly UTF-8

def 文字化け():
    '''Function with non-ASCII identifier; I believe this reads \"mojibake\"'''
    print(\"hello world!\")

文字化け()
",
    function: "文字化け",
    def_line: 5,
    last_line: 7,
    call_line: 9,
};

pub const NON_ASCII_FILENAME_FIXTURE: SourceFixture = SourceFixture {
    file_suffix: "_☠.py",
    body: "
def foo():
    '''Function with ASCII identifier in a file with a non-ASCII name'''
    print(\"hello world!\")

foo()
",
    function: "foo",
    def_line: 2,
    last_line: 4,
    call_line: 6,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuiteCase {
    InvokingRuntime,
    FunctionEntry,
    FunctionEncoding,
    FilenameEncoding,
}

impl SuiteCase {
    pub const ALL: [SuiteCase; 4] = [
        SuiteCase::InvokingRuntime,
        SuiteCase::FunctionEntry,
        SuiteCase::FunctionEncoding,
        SuiteCase::FilenameEncoding,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SuiteCase::InvokingRuntime => "invoking_runtime",
            SuiteCase::FunctionEntry => "function_entry",
            SuiteCase::FunctionEncoding => "function_encoding",
            SuiteCase::FilenameEncoding => "filename_encoding",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|case| case.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            SuiteCase::InvokingRuntime => "runtime runs under stap with a trivial script",
            SuiteCase::FunctionEntry => "function__entry fires for inline code",
            SuiteCase::FunctionEncoding => "non-ASCII function names survive the markers",
            SuiteCase::FilenameEncoding => "non-ASCII file names survive the markers",
        }
    }

    pub async fn run(self, harness: &ProbeHarness) -> Result<CaseOutcome, CaseError> {
        info!("Running case {}", self.name());
        match self {
            SuiteCase::InvokingRuntime => invoking_runtime(harness).await,
            SuiteCase::FunctionEntry => function_entry(harness).await,
            SuiteCase::FunctionEncoding => {
                run_fixture(harness, self.name(), &NON_ASCII_FUNCTION_FIXTURE).await
            }
            SuiteCase::FilenameEncoding => {
                if harness.build_info().filesystem_encoding_is_ascii() {
                    return Ok(CaseOutcome::Skipped(
                        "the test filename is not encodable with ASCII".to_string(),
                    ));
                }
                run_fixture(harness, self.name(), &NON_ASCII_FILENAME_FIXTURE).await
            }
        }
    }
}

/// The runtime starts under stap and both programs' output reaches stdout.
pub async fn invoking_runtime(harness: &ProbeHarness) -> Result<CaseOutcome, CaseError> {
    let result = harness
        .run_code(
            &println_on_begin("hello from stap"),
            "print('hello from python')",
        )
        .await?;

    check_lossy(SuiteCase::InvokingRuntime.name(), &result, |stdout| {
        expect_contains(stdout, "hello from stap")?;
        expect_contains(stdout, "hello from python")
    })
}

/// The entry marker fires for the module frame of inline code.
pub async fn function_entry(harness: &ProbeHarness) -> Result<CaseOutcome, CaseError> {
    let result = harness
        .run_code(harness.hierarchy_script(), "pass")
        .await?;

    check_lossy(SuiteCase::FunctionEntry.name(), &result, |stdout| {
        expect_contains(stdout, "=> <module> in <string>:1")
    })
}

async fn run_fixture(
    harness: &ProbeHarness,
    name: &str,
    fixture: &SourceFixture,
) -> Result<CaseOutcome, CaseError> {
    let file = fixture.materialize()?;
    let path = file.path();
    debug!("{}: tracing {}", name, path.display());

    let result = harness.run_file(harness.hierarchy_script(), path).await?;
    let file_name = path.to_string_lossy();
    let expected = fixture.expected_lines(&file_name);

    check_utf8(name, &result, |stdout| expect_in_order(stdout, &expected))
}

/// Strict UTF-8 decode; the non-ASCII names must come through intact.
fn check_utf8<F>(name: &str, result: &InvocationResult, checks: F) -> Result<CaseOutcome, CaseError>
where
    F: FnOnce(&str) -> Result<(), CaseError>,
{
    with_failure_dump(FailureDump::new(name, result), || {
        let stdout = result.stdout_utf8()?;
        checks(stdout)
    })?;
    Ok(CaseOutcome::Passed)
}

/// ASCII-only expectations. Unrelated frames (startup modules, truncated
/// `user_string` reads) may carry invalid UTF-8, which must not fail the case.
fn check_lossy<F>(name: &str, result: &InvocationResult, checks: F) -> Result<CaseOutcome, CaseError>
where
    F: FnOnce(&str) -> Result<(), CaseError>,
{
    with_failure_dump(FailureDump::new(name, result), || {
        checks(&result.stdout_lossy())
    })?;
    Ok(CaseOutcome::Passed)
}
