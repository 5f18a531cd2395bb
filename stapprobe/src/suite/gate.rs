use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

use stapprobe_process::{
    probe_tracer, resolve_probe_prefix, Availability, ProcessError, RuntimeBuildInfo,
    RuntimeTarget, Tracer, DEFAULT_LIBRARY_PATH_VAR, DEFAULT_VERBOSITY,
};
use stapprobe_script::{hierarchy_script, LinkMode};

use crate::suite::harness::ProbeHarness;

/// Everything the gate needs to decide whether the suite can run.
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    pub tracer_binary: PathBuf,
    pub verbosity: u8,
    pub runtime: PathBuf,
    pub link_mode: LinkMode,
    pub soname: Option<String>,
    pub library_path_var: String,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            tracer_binary: PathBuf::from("stap"),
            verbosity: DEFAULT_VERBOSITY,
            runtime: PathBuf::from("python3"),
            link_mode: LinkMode::Auto,
            soname: None,
            library_path_var: DEFAULT_LIBRARY_PATH_VAR.to_string(),
        }
    }
}

impl HarnessSettings {
    /// Defaults, overridden by `STAPPROBE_TRACER`, `STAPPROBE_RUNTIME`,
    /// `STAPPROBE_LINK_MODE` and `STAPPROBE_SONAME`.
    pub fn from_env() -> Result<Self, ProcessError> {
        let mut settings = Self::default();
        if let Some(tracer) = std::env::var_os("STAPPROBE_TRACER") {
            settings.tracer_binary = PathBuf::from(tracer);
        }
        if let Some(runtime) = std::env::var_os("STAPPROBE_RUNTIME") {
            settings.runtime = PathBuf::from(runtime);
        }
        if let Ok(mode) = std::env::var("STAPPROBE_LINK_MODE") {
            settings.link_mode = mode.parse()?;
        }
        if let Ok(soname) = std::env::var("STAPPROBE_SONAME") {
            settings.soname = Some(soname);
        }
        Ok(settings)
    }
}

/// Why the whole suite cannot be evaluated in this environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Tracer or runtime could not be started
    EnvironmentUnavailable(String),
    /// Tracer starts but cannot run even the smoke test
    NonFunctionalEnvironment { reason: String, stderr: String },
    /// Runtime was built without static markers
    RuntimeWithoutMarkers(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EnvironmentUnavailable(reason) => write!(f, "{}", reason),
            SkipReason::NonFunctionalEnvironment { reason, stderr } => {
                write!(f, "{}; stderr was: {}", reason, stderr.trim_end())
            }
            SkipReason::RuntimeWithoutMarkers(reason) => write!(f, "{}", reason),
        }
    }
}

/// Result of the one-time setup phase.
#[derive(Debug)]
pub enum SuiteGate {
    Ready(ProbeHarness),
    Skip(SkipReason),
}

impl SuiteGate {
    /// Probe the tracer, then the runtime, then fix the probe prefix.
    ///
    /// Environment problems become [`SuiteGate::Skip`]; only configuration
    /// mistakes (such as a shared build with no soname) are errors.
    pub async fn open(settings: &HarnessSettings) -> Result<Self, ProcessError> {
        let tracer = Tracer::new(&settings.tracer_binary).with_verbosity(settings.verbosity);

        let tracer_version = match probe_tracer(&tracer).await {
            Availability::Available { version } => version,
            Availability::Unavailable { reason } => {
                return Ok(Self::skip(SkipReason::EnvironmentUnavailable(reason)))
            }
            Availability::NonFunctional { reason, stderr } => {
                return Ok(Self::skip(SkipReason::NonFunctionalEnvironment {
                    reason,
                    stderr,
                }))
            }
        };

        let build = match RuntimeBuildInfo::query(&settings.runtime).await {
            Ok(build) => build,
            Err(e) => {
                return Ok(Self::skip(SkipReason::EnvironmentUnavailable(format!(
                    "Couldn't query runtime {}: {}",
                    settings.runtime.display(),
                    e
                ))))
            }
        };

        if !build.has_static_markers() {
            return Ok(Self::skip(SkipReason::RuntimeWithoutMarkers(format!(
                "{} was not configured --with-systemtap",
                build.executable.display()
            ))));
        }

        let prefix = resolve_probe_prefix(settings.link_mode, settings.soname.as_deref(), &build)?;
        let hierarchy = hierarchy_script(&prefix)?;
        let target = RuntimeTarget::new(&build.executable)
            .with_library_path_var(settings.library_path_var.clone());

        info!("✓ Suite gate open: {} tracing {}", tracer_version, build.executable.display());
        Ok(SuiteGate::Ready(ProbeHarness::new(
            tracer,
            tracer_version,
            target,
            prefix,
            hierarchy,
            build,
        )))
    }

    fn skip(reason: SkipReason) -> Self {
        warn!("Skipping suite: {}", reason);
        SuiteGate::Skip(reason)
    }

    pub fn harness(&self) -> Option<&ProbeHarness> {
        match self {
            SuiteGate::Ready(harness) => Some(harness),
            SuiteGate::Skip(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            SuiteGate::Ready(_) => None,
            SuiteGate::Skip(reason) => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_tracer_skips_instead_of_failing() {
        let settings = HarnessSettings {
            tracer_binary: PathBuf::from("/nonexistent/stapprobe/stap"),
            ..HarnessSettings::default()
        };
        let gate = SuiteGate::open(&settings).await.unwrap();
        assert!(matches!(
            gate.skip_reason(),
            Some(SkipReason::EnvironmentUnavailable(_))
        ));
        assert!(gate.harness().is_none());
    }

    #[test]
    fn non_functional_reason_includes_stderr() {
        let reason = SkipReason::NonFunctionalEnvironment {
            reason: "Test systemtap script did not run".to_string(),
            stderr: "Pass 4: compilation failed\n".to_string(),
        };
        assert_eq!(
            reason.to_string(),
            "Test systemtap script did not run; stderr was: Pass 4: compilation failed"
        );
    }
}
