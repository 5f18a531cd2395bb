use std::path::Path;

use stapprobe_process::{
    invoke_traced_target, InvocationResult, ProcessError, RuntimeBuildInfo, RuntimeTarget,
    TargetSource, Tracer,
};
use stapprobe_script::{ProbePrefix, TracerScript};

/// A tracer and runtime that passed the gate, plus the hierarchy script
/// rendered for this runtime's probe prefix.
#[derive(Debug, Clone)]
pub struct ProbeHarness {
    tracer: Tracer,
    tracer_version: String,
    target: RuntimeTarget,
    prefix: ProbePrefix,
    hierarchy: TracerScript,
    build: RuntimeBuildInfo,
}

impl ProbeHarness {
    pub fn new(
        tracer: Tracer,
        tracer_version: String,
        target: RuntimeTarget,
        prefix: ProbePrefix,
        hierarchy: TracerScript,
        build: RuntimeBuildInfo,
    ) -> Self {
        Self {
            tracer,
            tracer_version,
            target,
            prefix,
            hierarchy,
            build,
        }
    }

    pub fn tracer_version(&self) -> &str {
        &self.tracer_version
    }

    pub fn target(&self) -> &RuntimeTarget {
        &self.target
    }

    pub fn prefix(&self) -> &ProbePrefix {
        &self.prefix
    }

    pub fn hierarchy_script(&self) -> &TracerScript {
        &self.hierarchy
    }

    pub fn build_info(&self) -> &RuntimeBuildInfo {
        &self.build
    }

    pub async fn invoke(
        &self,
        script: &TracerScript,
        command: &str,
    ) -> Result<InvocationResult, ProcessError> {
        self.tracer.invoke(script, command).await
    }

    pub async fn invoke_traced_target(
        &self,
        script: &TracerScript,
        source: &TargetSource,
    ) -> Result<InvocationResult, ProcessError> {
        invoke_traced_target(&self.tracer, &self.target, script, source).await
    }

    pub async fn run_code(
        &self,
        script: &TracerScript,
        code: &str,
    ) -> Result<InvocationResult, ProcessError> {
        self.invoke_traced_target(script, &TargetSource::Inline(code.to_string()))
            .await
    }

    pub async fn run_file(
        &self,
        script: &TracerScript,
        path: &Path,
    ) -> Result<InvocationResult, ProcessError> {
        self.invoke_traced_target(script, &TargetSource::File(path.to_path_buf()))
            .await
    }
}
