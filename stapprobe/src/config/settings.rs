use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use stapprobe_process::{DEFAULT_LIBRARY_PATH_VAR, DEFAULT_VERBOSITY};
use stapprobe_script::LinkMode;

/// Log level enumeration for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(anyhow::anyhow!(
                "Invalid log level: {}. Valid options: error, warn, info, debug, trace",
                s
            )),
        }
    }
}

impl LogLevel {
    /// Convert to tracing level filter
    pub fn to_tracing_level_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub tracer: TracerConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Log file path (overridden by --log-file)
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Enable/disable file logging (overridden by --log/--no-log)
    #[serde(default)]
    pub enable_logging: bool,
    /// Log level filter (overridden by --log-level)
    #[serde(default)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TracerConfig {
    /// Tracer executable, looked up on PATH when relative (overridden by --tracer)
    #[serde(default = "default_tracer_binary")]
    pub binary: String,
    /// Number of -v flags passed to the tracer (overridden by --verbosity)
    #[serde(default = "default_verbosity")]
    pub verbosity: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Runtime executable under test (overridden by --runtime)
    #[serde(default = "default_runtime_executable")]
    pub executable: String,
    /// Where the markers live: auto, shared or static (overridden by --link-mode)
    #[serde(default)]
    pub link_mode: LinkMode,
    /// Shared library holding the markers; defaults to the runtime's INSTSONAME
    #[serde(default)]
    pub soname: Option<String>,
    /// Variable re-exported into the traced command line
    #[serde(default = "default_library_path_var")]
    pub library_path_var: String,
}

// Default value functions
fn default_log_file() -> String {
    "stapprobe.log".to_string()
}

fn default_tracer_binary() -> String {
    "stap".to_string()
}

fn default_verbosity() -> u8 {
    DEFAULT_VERBOSITY
}

fn default_runtime_executable() -> String {
    "python3".to_string()
}

fn default_library_path_var() -> String {
    DEFAULT_LIBRARY_PATH_VAR.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            enable_logging: false,
            log_level: LogLevel::default(),
        }
    }
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            binary: default_tracer_binary(),
            verbosity: default_verbosity(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            executable: default_runtime_executable(),
            link_mode: LinkMode::default(),
            soname: None,
            library_path_var: default_library_path_var(),
        }
    }
}

impl Config {
    /// First existing file of `~/.stapprobe/config.toml` and `./stapprobe.toml`,
    /// or defaults when neither exists
    pub fn load() -> Result<Self> {
        match Self::search_paths().into_iter().find(|path| path.exists()) {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                debug!("No configuration file found, using default settings");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            )
        })?;

        Self::parse(&content, &path.display().to_string())
    }

    /// Parse TOML text; `origin` names the source in error messages
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Self::friendly_toml_error(origin, content, e))
    }

    /// Point at the offending column and say which stapprobe setting it hits.
    fn friendly_toml_error(origin: &str, content: &str, error: toml::de::Error) -> anyhow::Error {
        let hint = Self::hint_for(error.message());
        let Some(span) = error.span() else {
            return anyhow::anyhow!(
                "Invalid configuration in '{}': {}\nHint: {}",
                origin,
                error.message(),
                hint
            );
        };

        let (line, column) = line_and_column(content, span.start);
        let source_line = content.lines().nth(line - 1).unwrap_or("");
        anyhow::anyhow!(
            "Invalid configuration in '{}' at line {}, column {}: {}\n  {}\n  {}^\nHint: {}",
            origin,
            line,
            column,
            error.message(),
            source_line,
            " ".repeat(column - 1),
            hint
        )
    }

    fn hint_for(message: &str) -> &'static str {
        if message.contains("unknown variant") && message.contains("`auto`") {
            "runtime.link_mode is one of \"auto\", \"shared\", \"static\""
        } else if message.contains("unknown variant") && message.contains("`warn`") {
            "general.log_level is one of \"error\", \"warn\", \"info\", \"debug\", \"trace\""
        } else if message.contains("unknown field") {
            "[general] takes log_file, enable_logging, log_level; [tracer] takes binary, \
             verbosity; [runtime] takes executable, link_mode, soname, library_path_var"
        } else if message.contains("invalid type") {
            "tracer.verbosity is an integer and general.enable_logging a boolean; \
             everything else is a quoted string"
        } else {
            "check the TOML syntax at the marked column"
        }
    }

    fn search_paths() -> Vec<PathBuf> {
        let user = dirs::home_dir().map(|home| home.join(".stapprobe").join("config.toml"));
        let project = std::env::current_dir()
            .ok()
            .map(|cwd| cwd.join("stapprobe.toml"));
        user.into_iter().chain(project).collect()
    }

    /// `--config`: the file must exist
    pub fn load_with_explicit_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Specified configuration file does not exist: {}",
                path.display()
            ));
        }
        Self::load_from_file(path)
    }
}

/// 1-based line and column (in chars) of byte `offset` in `content`
fn line_and_column(content: &str, offset: usize) -> (usize, usize) {
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map_or(0, |tail| tail.chars().count())
        + 1;
    (line, column)
}
