//! viz-rules command line.
//!
//! Loads settings and rules, then resolves, lists or checks them.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::debug;
use viz_style_rules::cli::{Cli, Command};
use viz_style_rules::config::{ConfigLoader, ConfigPaths};
use viz_style_rules::error::ErrorReport;
use viz_style_rules::format::{OutputFormat, format_error};
use viz_style_rules::logging::{LogTarget, init_logging};
use viz_style_rules::rules::FactoryRegistry;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_target = match cli.log.parse::<LogTarget>() {
        Ok(target) => target,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };
    if let Err(e) = init_logging(&log_target, cli.verbose) {
        eprintln!("error: cannot initialize logging: {}", e);
        return ExitCode::from(2);
    }

    let loader = match load_settings(&cli) {
        Ok(loader) => loader,
        Err(e) => return report_failure(e, OutputFormat::default()),
    };
    let format = loader.config().output.format;

    match run(&cli, &loader) {
        Ok(code) => code,
        Err(e) => report_failure(e, command_format(&cli.command).unwrap_or(format)),
    }
}

fn load_settings(cli: &Cli) -> Result<ConfigLoader> {
    let loader = match cli.config {
        Some(ref path) => ConfigLoader::load_from(ConfigPaths::discover(), path.clone())?,
        None => ConfigLoader::load()?,
    };
    debug!(sources = ?loader.sources(), "Settings loaded");
    Ok(loader)
}

fn run(cli: &Cli, loader: &ConfigLoader) -> Result<ExitCode> {
    let factories = FactoryRegistry::with_builtins();

    match cli.command {
        Command::Resolve(ref args) => {
            println!("{}", args.run(loader, &factories)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Rules(ref args) => {
            println!("{}", args.run(loader, &factories)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Check(ref args) => {
            let report = args.check(loader, &factories);
            println!("{}", report.render(args.format(loader))?);
            Ok(if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn command_format(command: &Command) -> Option<OutputFormat> {
    match command {
        Command::Resolve(args) => args.format,
        Command::Rules(args) => args.format,
        Command::Check(args) => args.format,
    }
}

fn report_failure(err: anyhow::Error, format: OutputFormat) -> ExitCode {
    let report = ErrorReport::from(err);
    eprintln!("{}", format_error(&report, format));
    ExitCode::FAILURE
}
