//! Gatorgrade CLI - run the checks of an assignment

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use gatorgrade::config::{CheckConfig, DEFAULT_CONFIG_FILE};
use gatorgrade::engine::{ProcessEngine, DEFAULT_ENGINE_PROGRAM};
use gatorgrade::filter::{StatusFilter, Summary};
use gatorgrade::report::{ReportParams, ReportWriter};
use gatorgrade::runner::{RunOptions, Runner};
use gatorgrade::{build_checks, ConsoleFormatter, Executor, SetupRunner};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gatorgrade",
    version,
    about = "Assignment checker",
    long_about = "Runs the checks listed in a YAML configuration and reports which ones pass."
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Write a report: destination (file, env), format (json, md) and name
    #[arg(long, num_args = 3, value_names = ["DESTINATION", "FORMAT", "NAME"])]
    report: Option<Vec<String>>,

    /// Maximum number of lines in a JSON report
    #[arg(long)]
    output_limit: Option<usize>,

    /// Only show checks with this status (pass, fail)
    #[arg(long)]
    check_status: Option<StatusFilter>,

    /// Only show failing checks, with diagnostics
    #[arg(long)]
    show_failures: bool,

    /// Only show checks whose description matches this text
    #[arg(long)]
    check_include: Option<String>,

    /// Hide checks whose description matches this text
    #[arg(long)]
    check_exclude: Option<String>,

    /// Similarity (0-100) for fuzzy description matching
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    fuzzy_threshold: Option<u8>,

    /// Checking engine program
    #[arg(long, default_value = DEFAULT_ENGINE_PROGRAM)]
    engine: String,

    /// Show progress while checks run
    #[arg(long)]
    progress: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn report_params(&self) -> ReportParams {
        match self.report.as_deref() {
            Some([destination, format, name]) => ReportParams::new(destination, format, name),
            _ => ReportParams::default(),
        }
    }

    fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::new();
        options.merge_cli(
            self.check_status,
            self.check_include.clone(),
            self.check_exclude.clone(),
            self.fuzzy_threshold,
            self.show_failures,
        );
        options.progress = self.progress;
        options.output_limit = self.output_limit;
        options
    }
}

/// Name shown in the summary when the configuration does not set one
fn default_project_name() -> String {
    std::env::current_dir()
        .ok()
        .and_then(|dir| dir.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "this project".to_string())
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = CheckConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let checks = build_checks(&config.body)?;
    log::debug!("{} checks loaded from {}", checks.len(), cli.config.display());

    let project = config
        .front_matter
        .name
        .clone()
        .unwrap_or_else(default_project_name);

    if let Some(setup) = &config.front_matter.setup {
        println!("Running set up commands...");
        SetupRunner::new().run(setup)?;
        println!("Finished!\n");
    }

    let options = cli.run_options();
    let engine = ProcessEngine::new(&cli.engine);
    log::debug!("checking engine: {}", engine.program());
    let runner = Runner::new(Executor::new(&engine)).with_progress(options.progress);
    let results = runner.run(&checks);

    let console = ConsoleFormatter::new();
    let shown = options.filter.apply(&results);
    print!("{}", console.format_results(&shown, options.show_failures));

    ReportWriter::new(&project)
        .with_line_limit(options.output_limit)
        .configure_report(&cli.report_params(), &results)?;

    let summary = Summary::from_results(&results);
    print!("{}", console.format_summary(&summary, &project));

    Ok(if summary.all_passed() { 0 } else { 1 })
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}
