#![allow(clippy::uninlined_format_args)]
#![allow(dead_code)]

//! Common test utilities shared across integration tests

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tokio::sync::OnceCell;

use stapprobe::suite::expect::MarkerKind;
use stapprobe::suite::{HarnessSettings, ProbeHarness, SourceFixture, SuiteGate};

static INIT: Once = Once::new();
static GATE: OnceCell<SuiteGate> = OnceCell::const_new();

/// Initialize logging for tests (call once per test)
pub fn init() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("off")
            .try_init()
            .ok();
    });
}

/// The gate for the real environment (`STAPPROBE_*` overrides apply),
/// opened once per test binary.
pub async fn gate() -> &'static SuiteGate {
    GATE.get_or_init(|| async {
        let settings = HarnessSettings::from_env().expect("valid STAPPROBE_* settings");
        SuiteGate::open(&settings)
            .await
            .expect("suite gate configuration")
    })
    .await
}

/// The harness if the environment can run the suite. Otherwise prints why
/// and returns `None` so the caller can return early.
pub async fn harness_or_skip(test: &str) -> Option<&'static ProbeHarness> {
    match gate().await {
        SuiteGate::Ready(harness) => Some(harness),
        SuiteGate::Skip(reason) => {
            eprintln!("⏭️  Skipping {}: {}", test, reason);
            None
        }
    }
}

pub fn write_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write fake executable");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake executable");
    path
}

/// A runtime that answers the build query with canned values.
pub fn fake_runtime_body(config_args: &str, soname: &str, encoding: &str) -> String {
    format!(
        "#!/bin/sh\nprintf '%s\\n' \"$0\" '{}' '{}' '{}'\n",
        config_args, soname, encoding
    )
}

const TRACER_HEADER: &str = r#"#!/bin/sh
if [ "$1" = "-V" ]; then
    echo "Systemtap translator/driver (version 5.0/0.190, fake)" >&2
    exit 0
fi
script=$(cat)
cmd="$4"
if [ "$cmd" = "true" ]; then
    echo "hello world"
    exit 0
fi
printf '%s' "$cmd" > "@DIR@/command"
"#;

/// Shell lines printing `fixture`'s hierarchy output for the file in `$path`,
/// optionally in reverse.
pub fn emulated_hierarchy(fixture: &SourceFixture, reverse: bool) -> String {
    let mut lines: Vec<String> = fixture
        .expected_lines("@FILE@")
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let depth = usize::from(line.function != "<module>");
            let pad = match line.kind {
                MarkerKind::Entry => depth + 1,
                MarkerKind::Return => depth,
            };
            format!("{:6} python3(42):{} {}", i * 3, " ".repeat(pad), line)
        })
        .collect();
    if reverse {
        lines.reverse();
    }
    lines
        .iter()
        .map(|line| format!("printf '%s\\n' '{}' | sed \"s|@FILE@|$path|\"", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// What the hierarchy script prints for inline `pass`
pub const INLINE_PASS_LINES: &str = "\
        echo '     0 python3(42):  => <module> in <string>:1'
        echo '     2 python3(42): <= <module> in <string>:1'";

/// A tracer that behaves like a working `stap` attached to a marker-enabled
/// runtime: it answers `-V`, passes the smoke test, and prints what the
/// hierarchy script would print for the inline and fixture cases.
pub fn emulating_tracer_body(function_lines: &str, filename_lines: &str) -> String {
    emulating_tracer_body_with(INLINE_PASS_LINES, function_lines, filename_lines)
}

/// Like [`emulating_tracer_body`], with custom shell lines for inline `pass`.
pub fn emulating_tracer_body_with(
    inline_lines: &str,
    function_lines: &str,
    filename_lines: &str,
) -> String {
    format!(
        r#"{header}
case "$script" in
    *function__entry*) ;;
    *)
        case "$cmd" in
            *"hello from python"*)
                echo "hello from stap"
                echo "hello from python"
                exit 0
                ;;
        esac
        echo "unexpected script" >&2
        exit 1
        ;;
esac
case "$cmd" in
    *" -c pass")
{inline_lines}
        exit 0
        ;;
esac
eval "set -- $cmd"
for last; do path=$last; done
printf '%s' "$path" > "@DIR@/seen"
echo "hello world!"
case "$path" in
    *.py)
        case "$path" in
            *☠*)
{filename_lines}
                ;;
            *)
{function_lines}
                ;;
        esac
        ;;
esac
"#,
        header = TRACER_HEADER,
        inline_lines = inline_lines,
        function_lines = function_lines,
        filename_lines = filename_lines,
    )
}

/// A fake tracer and runtime living in one temp dir.
pub struct FakeEnv {
    pub dir: TempDir,
    pub tracer: PathBuf,
    pub runtime: PathBuf,
}

impl FakeEnv {
    /// `tracer_body` may use `@DIR@` for the fake's own directory.
    pub fn new(tracer_body: &str, runtime_body: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix("stapprobe_fake")
            .tempdir()
            .expect("create fake env dir");
        let dir_str = dir.path().to_string_lossy().to_string();
        let tracer = write_executable(dir.path(), "stap", &tracer_body.replace("@DIR@", &dir_str));
        let runtime = write_executable(dir.path(), "python3", runtime_body);
        Self {
            dir,
            tracer,
            runtime,
        }
    }

    /// Emulates a working environment for every case.
    pub fn working(config_args: &str, soname: &str, encoding: &str) -> Self {
        Self::new(
            &emulating_tracer_body(
                &emulated_hierarchy(&stapprobe::suite::cases::NON_ASCII_FUNCTION_FIXTURE, false),
                &emulated_hierarchy(&stapprobe::suite::cases::NON_ASCII_FILENAME_FIXTURE, false),
            ),
            &fake_runtime_body(config_args, soname, encoding),
        )
    }

    pub fn settings(&self) -> HarnessSettings {
        HarnessSettings {
            tracer_binary: self.tracer.clone(),
            runtime: self.runtime.clone(),
            ..HarnessSettings::default()
        }
    }

    /// The source path the tracer last saw, if any
    pub fn seen_path(&self) -> Option<PathBuf> {
        fs::read_to_string(self.dir.path().join("seen"))
            .ok()
            .map(PathBuf::from)
    }

    /// The `-c` command the tracer last received, if any
    pub fn seen_command(&self) -> Option<String> {
        fs::read_to_string(self.dir.path().join("command")).ok()
    }
}
