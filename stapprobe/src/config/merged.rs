use std::path::PathBuf;

use stapprobe_script::LinkMode;

use crate::config::{Config, LogLevel, ParsedArgs, ReportFormat};
use crate::suite::{HarnessSettings, SuiteCase};

/// Final merged configuration that combines command line arguments and config file settings
/// Command line arguments take priority over config file settings
#[derive(Debug, Clone)]
pub struct MergedConfig {
    // Tracer
    pub tracer_binary: PathBuf,
    pub verbosity: u8,

    // Runtime under test
    pub runtime_executable: PathBuf,
    pub link_mode: LinkMode,
    pub soname: Option<String>,
    pub library_path_var: String,

    // Logging
    pub log_file: PathBuf,
    pub enable_logging: bool,
    pub log_console: bool,
    pub log_level: LogLevel,

    // Run selection and output
    pub cases: Vec<String>,
    pub list: bool,
    pub format: ReportFormat,
}

impl MergedConfig {
    /// Create merged configuration from parsed arguments and config file
    pub fn new(args: ParsedArgs, config: Config) -> Self {
        Self {
            tracer_binary: args
                .tracer
                .unwrap_or_else(|| PathBuf::from(&config.tracer.binary)),
            verbosity: args.verbosity.unwrap_or(config.tracer.verbosity),
            runtime_executable: args
                .runtime
                .unwrap_or_else(|| PathBuf::from(&config.runtime.executable)),
            link_mode: args.link_mode.unwrap_or(config.runtime.link_mode),
            soname: args.soname.or(config.runtime.soname),
            library_path_var: config.runtime.library_path_var,
            log_file: args
                .log_file
                .unwrap_or_else(|| PathBuf::from(&config.general.log_file)),
            enable_logging: args
                .enable_logging
                .unwrap_or(config.general.enable_logging),
            log_console: args.log_console,
            log_level: args.log_level.unwrap_or(config.general.log_level),
            cases: args.cases,
            list: args.list,
            format: args.format,
        }
    }

    pub fn harness_settings(&self) -> HarnessSettings {
        HarnessSettings {
            tracer_binary: self.tracer_binary.clone(),
            verbosity: self.verbosity,
            runtime: self.runtime_executable.clone(),
            link_mode: self.link_mode,
            soname: self.soname.clone(),
            library_path_var: self.library_path_var.clone(),
        }
    }

    /// Cases named with --case, or every case when none were named
    pub fn selected_cases(&self) -> anyhow::Result<Vec<SuiteCase>> {
        if self.cases.is_empty() {
            return Ok(SuiteCase::ALL.to_vec());
        }
        self.cases
            .iter()
            .map(|name| {
                SuiteCase::from_name(name).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Unknown case '{}'. Available cases: {}",
                        name,
                        SuiteCase::ALL
                            .iter()
                            .map(|c| c.name())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                })
            })
            .collect()
    }

    /// Log file to open, or `None` when file logging is off
    pub fn log_file_if_enabled(&self) -> Option<&std::path::Path> {
        self.enable_logging.then_some(self.log_file.as_path())
    }
}
