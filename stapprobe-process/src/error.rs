/// Process-level errors raised while driving the tracer or the runtime
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to start '{binary}': {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },

    #[error("Failed to write script to '{binary}' stdin: {source}")]
    Stdin {
        binary: String,
        source: std::io::Error,
    },

    #[error("Failed to collect output of '{binary}': {source}")]
    Wait {
        binary: String,
        source: std::io::Error,
    },

    #[error("Runtime build query failed: {0}")]
    RuntimeQuery(String),

    #[error("'{executable}' is a shared-library build but no soname is known; set runtime.soname")]
    MissingSoname { executable: String },

    #[error("Script error: {0}")]
    Script(#[from] stapprobe_script::ScriptError),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
