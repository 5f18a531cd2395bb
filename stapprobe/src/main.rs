use anyhow::Result;
use tracing::info;

use stapprobe::config::{Args, Config, MergedConfig, ReportFormat};
use stapprobe::logging;
use stapprobe::suite::{run_suite, SuiteCase};

/// Exit code for configuration and usage errors
const EXIT_CONFIG_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_CONFIG_ERROR
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let parsed_args = Args::parse_args()?;

    let config = match &parsed_args.config {
        Some(path) => Config::load_with_explicit_path(path)?,
        None => Config::load()?,
    };
    let merged = MergedConfig::new(parsed_args, config);

    logging::initialize_logging(
        merged.log_file_if_enabled(),
        merged.log_console,
        merged.log_level,
    )?;

    if merged.list {
        for case in SuiteCase::ALL {
            println!("{:<20} {}", case.name(), case.description());
        }
        return Ok(0);
    }

    let cases = merged.selected_cases()?;
    info!(
        "Running {} case(s) with tracer {} against {}",
        cases.len(),
        merged.tracer_binary.display(),
        merged.runtime_executable.display()
    );

    let report = run_suite(&merged.harness_settings(), &cases).await?;
    match merged.format {
        ReportFormat::Text => print!("{}", report.render_text()),
        ReportFormat::Json => println!("{}", report.render_json()?),
    }

    Ok(report.exit_code())
}
