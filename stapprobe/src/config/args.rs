use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use stapprobe_script::LinkMode;

use crate::config::settings::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// One line per case, human readable
    #[default]
    Text,
    /// A single JSON document
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "stapprobe")]
#[command(about = "Verify a runtime's SystemTap static markers by tracing it under stap")]
#[command(version)]
pub struct Args {
    /// Tracer executable (default: stap)
    #[arg(long, value_name = "PATH")]
    pub tracer: Option<PathBuf>,

    /// Number of -v flags passed to the tracer (default: 2)
    #[arg(long, value_name = "N")]
    pub verbosity: Option<u8>,

    /// Runtime executable under test (default: python3)
    #[arg(long, short = 'r', value_name = "PATH")]
    pub runtime: Option<PathBuf>,

    /// Where the markers live: auto, shared or static
    /// auto asks the runtime for its build configuration, which some builds report wrongly
    #[arg(long, value_name = "MODE")]
    pub link_mode: Option<String>,

    /// Shared library holding the markers (shared builds only)
    #[arg(long, value_name = "SONAME")]
    pub soname: Option<String>,

    /// Run only the named case (repeatable; see --list)
    #[arg(long = "case", value_name = "NAME")]
    pub cases: Vec<String>,

    /// List the available cases and exit
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub list: bool,

    /// Report format
    #[arg(long, value_name = "FORMAT", value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Specify custom configuration file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path (default: ./stapprobe.log)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Enable logging to file (overrides config file)
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "no_log")]
    pub log: bool,

    /// Disable logging completely (overrides config file)
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub no_log: bool,

    /// Also log to stderr
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub log_console: bool,

    /// Set log level (error, warn, info, debug, trace)
    /// Priority: 1. RUST_LOG env var, 2. Command line, 3. Config file (default: warn)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Arguments after validation; `None` means "use the config file"
#[derive(Debug, Clone)]
pub struct ParsedArgs {
    pub tracer: Option<PathBuf>,
    pub verbosity: Option<u8>,
    pub runtime: Option<PathBuf>,
    pub link_mode: Option<LinkMode>,
    pub soname: Option<String>,
    pub cases: Vec<String>,
    pub list: bool,
    pub format: ReportFormat,
    pub config: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub enable_logging: Option<bool>,
    pub log_console: bool,
    pub log_level: Option<LogLevel>,
}

impl Args {
    /// Parse process arguments, exiting with clap's usage message on syntax errors
    pub fn parse_args() -> Result<ParsedArgs> {
        Args::parse().into_parsed()
    }

    pub fn into_parsed(self) -> Result<ParsedArgs> {
        let link_mode = self
            .link_mode
            .as_deref()
            .map(str::parse::<LinkMode>)
            .transpose()?;
        let log_level = self
            .log_level
            .as_deref()
            .map(str::parse::<LogLevel>)
            .transpose()?;

        let enable_logging = match (self.log, self.no_log) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };

        Ok(ParsedArgs {
            tracer: self.tracer,
            verbosity: self.verbosity,
            runtime: self.runtime,
            link_mode,
            soname: self.soname,
            cases: self.cases,
            list: self.list,
            format: self.format,
            config: self.config,
            log_file: self.log_file,
            enable_logging,
            log_console: self.log_console,
            log_level,
        })
    }
}
