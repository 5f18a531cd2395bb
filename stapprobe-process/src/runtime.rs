use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use stapprobe_script::{LinkMode, ProbePrefix};

use crate::error::{ProcessError, Result};

/// Asks the runtime to describe its own build, one value per line.
const BUILD_QUERY: &str = "\
import sys, sysconfig
print(sys.executable)
print(sysconfig.get_config_var('CONFIG_ARGS') or '')
print(sysconfig.get_config_var('INSTSONAME') or '')
print(sys.getfilesystemencoding())
";

const MARKER_CONFIG_FLAGS: [&str; 2] = ["--with-systemtap", "--with-dtrace"];
const SHARED_CONFIG_FLAG: &str = "--enable-shared";

/// Build facts reported by the runtime about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeBuildInfo {
    /// Absolute path of the interpreter as the runtime resolves it
    pub executable: PathBuf,
    /// `./configure` arguments the runtime was built with
    pub config_args: String,
    /// Shared-library soname, when the build produced one
    pub instsoname: Option<String>,
    pub filesystem_encoding: String,
}

impl RuntimeBuildInfo {
    pub async fn query<P: AsRef<Path>>(executable: P) -> Result<Self> {
        let executable = executable.as_ref();
        debug!("Querying build configuration of {}", executable.display());

        let output = Command::new(executable)
            .arg("-c")
            .arg(BUILD_QUERY)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                binary: executable.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProcessError::RuntimeQuery(format!(
                "{} exited with {}: {}",
                executable.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }

    pub fn parse(stdout: &str) -> Result<Self> {
        let lines: Vec<&str> = stdout.lines().collect();
        if lines.len() < 4 {
            return Err(ProcessError::RuntimeQuery(format!(
                "expected 4 lines of build information, got {}",
                lines.len()
            )));
        }

        let executable = lines[0].trim();
        if executable.is_empty() {
            return Err(ProcessError::RuntimeQuery(
                "runtime did not report its executable path".to_string(),
            ));
        }
        let instsoname = Some(lines[2].trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            executable: PathBuf::from(executable),
            config_args: lines[1].trim().to_string(),
            instsoname,
            filesystem_encoding: lines[3].trim().to_string(),
        })
    }

    /// Whether the runtime was configured to compile in static markers.
    pub fn has_static_markers(&self) -> bool {
        MARKER_CONFIG_FLAGS
            .iter()
            .any(|flag| self.config_args.contains(flag))
    }

    pub fn is_shared_build(&self) -> bool {
        self.config_args.contains(SHARED_CONFIG_FLAG)
    }

    pub fn filesystem_encoding_is_ascii(&self) -> bool {
        self.filesystem_encoding.eq_ignore_ascii_case("ascii")
    }
}

/// Decide where the markers live. Computed once before any case runs.
///
/// `soname` overrides the runtime-reported `INSTSONAME`.
pub fn resolve_probe_prefix(
    link_mode: LinkMode,
    soname: Option<&str>,
    build: &RuntimeBuildInfo,
) -> Result<ProbePrefix> {
    let shared = match link_mode {
        LinkMode::Shared => true,
        LinkMode::Static => false,
        LinkMode::Auto => build.is_shared_build(),
    };

    let prefix = if shared {
        let soname = soname
            .map(str::to_string)
            .or_else(|| build.instsoname.clone())
            .ok_or_else(|| ProcessError::MissingSoname {
                executable: build.executable.display().to_string(),
            })?;
        ProbePrefix::shared_library(&build.executable, soname)
    } else {
        if soname.is_some() {
            warn!("runtime.soname is set but a static build was selected; ignoring it");
        }
        ProbePrefix::executable(&build.executable)
    };

    info!("Probe prefix ({} build): {}", prefix.link_mode(), prefix);
    Ok(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(config_args: &str, soname: &str) -> RuntimeBuildInfo {
        RuntimeBuildInfo::parse(&format!(
            "/opt/py/bin/python3\n{config_args}\n{soname}\nutf-8\n"
        ))
        .unwrap()
    }

    #[test]
    fn parse_reads_all_fields() {
        let info = build("'--with-systemtap' '--enable-shared'", "libpython3.12.so.1.0");
        assert_eq!(info.executable, PathBuf::from("/opt/py/bin/python3"));
        assert_eq!(info.instsoname.as_deref(), Some("libpython3.12.so.1.0"));
        assert!(info.has_static_markers());
        assert!(info.is_shared_build());
        assert!(!info.filesystem_encoding_is_ascii());
    }

    #[test]
    fn parse_rejects_truncated_output() {
        assert!(matches!(
            RuntimeBuildInfo::parse("/usr/bin/python3\n"),
            Err(ProcessError::RuntimeQuery(_))
        ));
    }

    #[test]
    fn dtrace_flag_counts_as_markers() {
        assert!(build("--with-dtrace", "").has_static_markers());
        assert!(!build("--prefix=/usr", "").has_static_markers());
    }

    #[test]
    fn auto_follows_build_configuration() {
        let shared = build("--with-systemtap --enable-shared", "libpython3.so");
        assert_eq!(
            resolve_probe_prefix(LinkMode::Auto, None, &shared).unwrap(),
            ProbePrefix::shared_library("/opt/py/bin/python3", "libpython3.so")
        );

        let static_build = build("--with-systemtap", "libpython3.a");
        assert_eq!(
            resolve_probe_prefix(LinkMode::Auto, None, &static_build).unwrap(),
            ProbePrefix::executable("/opt/py/bin/python3")
        );
    }

    #[test]
    fn explicit_mode_overrides_detection() {
        let shared = build("--with-systemtap --enable-shared", "libpython3.so");
        assert_eq!(
            resolve_probe_prefix(LinkMode::Static, None, &shared).unwrap(),
            ProbePrefix::executable("/opt/py/bin/python3")
        );

        let static_build = build("--with-systemtap", "");
        assert_eq!(
            resolve_probe_prefix(LinkMode::Shared, Some("libpython3.12.so"), &static_build)
                .unwrap(),
            ProbePrefix::shared_library("/opt/py/bin/python3", "libpython3.12.so")
        );
    }

    #[test]
    fn shared_without_soname_is_an_error() {
        let info = build("--with-systemtap", "");
        assert!(matches!(
            resolve_probe_prefix(LinkMode::Shared, None, &info),
            Err(ProcessError::MissingSoname { .. })
        ));
    }
}
