use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use stapprobe_script::TracerScript;

use crate::error::{ProcessError, Result};
use crate::invocation::{Invocation, InvocationResult};

/// `-vv`: stap reports each compilation pass on stderr
pub const DEFAULT_VERBOSITY: u8 = 2;

/// Handle on the `stap` binary.
#[derive(Debug, Clone)]
pub struct Tracer {
    binary: PathBuf,
    verbosity: u8,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new("stap")
    }
}

impl Tracer {
    pub fn new<P: AsRef<Path>>(binary: P) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            verbosity: DEFAULT_VERBOSITY,
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    fn binary_name(&self) -> String {
        self.binary.display().to_string()
    }

    /// `- [-v...] -c <command>`: script from stdin, trace `command`.
    pub fn args_for(&self, command: &str) -> Vec<OsString> {
        let mut args = vec![OsString::from("-")];
        if self.verbosity > 0 {
            args.push(OsString::from(format!(
                "-{}",
                "v".repeat(self.verbosity as usize)
            )));
        }
        args.push(OsString::from("-c"));
        args.push(OsString::from(command));
        args
    }

    /// Run `stap -V`. Only whether the binary starts matters; the banner
    /// (stap prints it on stderr) is returned for reporting.
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("-V")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                binary: self.binary_name(),
                source,
            })?;

        let banner = if output.stderr.is_empty() {
            &output.stdout
        } else {
            &output.stderr
        };
        let first_line = String::from_utf8_lossy(banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        debug!("{} -V: {}", self.binary_name(), first_line);
        Ok(first_line)
    }

    /// Trace `command` with `script`, returning once the tracer has exited.
    pub async fn invoke(&self, script: &TracerScript, command: &str) -> Result<InvocationResult> {
        let args = self.args_for(command);
        debug!("Spawning {} {:?}", self.binary_name(), args);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                binary: self.binary_name(),
                source,
            })?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(script.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        // stdout/stderr are drained while stdin is fed so a chatty child can't
        // wedge on a full pipe.
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|source| ProcessError::Wait {
            binary: self.binary_name(),
            source,
        })?;

        match fed {
            Ok(()) => {}
            // The tracer may exit (e.g. on a usage error) before reading its script.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("{} closed stdin early", self.binary_name());
            }
            Err(source) => {
                return Err(ProcessError::Stdin {
                    binary: self.binary_name(),
                    source,
                })
            }
        }

        info!(
            "{} exited with {} ({} bytes stdout, {} bytes stderr)",
            self.binary_name(),
            output.status,
            output.stdout.len(),
            output.stderr.len()
        );

        Ok(InvocationResult {
            stdout: output.stdout,
            stderr: output.stderr,
            status: output.status,
        })
    }

    pub async fn run(&self, invocation: &Invocation) -> Result<InvocationResult> {
        self.invoke(&invocation.script, &invocation.command_line())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_tracer(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-stap");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn args_select_stdin_script_and_command() {
        let tracer = Tracer::new("stap");
        assert_eq!(
            tracer.args_for("true"),
            vec![
                OsString::from("-"),
                OsString::from("-vv"),
                OsString::from("-c"),
                OsString::from("true")
            ]
        );
    }

    #[test]
    fn zero_verbosity_omits_flag() {
        let tracer = Tracer::new("stap").with_verbosity(0);
        assert_eq!(tracer.args_for("true").len(), 3);
    }

    #[tokio::test]
    async fn invoke_pipes_script_and_collects_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        // Echo the script back on stdout and the arguments on stderr.
        let tracer = Tracer::new(fake_tracer(dir.path(), r#"cat; echo "$@" >&2"#));

        let result = tracer
            .invoke(&TracerScript::from("probe begin { exit () }"), "true")
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.stdout, b"probe begin { exit () }");
        assert_eq!(result.stderr_lossy(), "- -vv -c true\n");
    }

    #[tokio::test]
    async fn invoke_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let tracer = Tracer::new(fake_tracer(dir.path(), "cat >/dev/null; exit 3"));

        let result = tracer
            .invoke(&TracerScript::from("x"), "true")
            .await
            .unwrap();
        assert_eq!(result.exit_code(), Some(3));
    }

    #[tokio::test]
    async fn invoke_tolerates_tracer_ignoring_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let tracer = Tracer::new(fake_tracer(dir.path(), "echo ignored"));
        let big = TracerScript::new(vec![b'#'; 1 << 20]);

        let result = tracer.invoke(&big, "true").await.unwrap();
        assert_eq!(result.stdout_lossy(), "ignored\n");
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let tracer = Tracer::new("/nonexistent/stapprobe/stap");
        let err = tracer
            .invoke(&TracerScript::from(""), "true")
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));

        let err = tracer.version().await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn version_returns_first_banner_line() {
        let dir = tempfile::tempdir().unwrap();
        let tracer = Tracer::new(fake_tracer(
            dir.path(),
            r#"echo "Systemtap translator/driver (version 5.0)" >&2; echo "Copyright" >&2"#,
        ));
        assert_eq!(
            tracer.version().await.unwrap(),
            "Systemtap translator/driver (version 5.0)"
        );
    }
}
