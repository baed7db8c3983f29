//! CLI command definitions for viz-rules
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod check;
pub mod resolve;
pub mod rules;

use crate::config::ConfigLoader;
use crate::rules::{FactoryRegistry, RuleSet};
use anyhow::Result;
use check::CheckArgs;
use clap::{Parser, Subcommand};
use resolve::ResolveArgs;
use rules::RulesArgs;
use std::path::PathBuf;
use tracing::warn;

/// Resolve default visual styles for visualization modules
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to settings file (replaces project and user settings)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the effective configuration for a module
    Resolve(ResolveArgs),

    /// List loaded rules in application order
    Rules(RulesArgs),

    /// Validate rule files and report every malformed rule
    Check(CheckArgs),
}

/// Build the configured rule set plus `extra` files, logging rejected rules.
pub(crate) fn load_rule_set(
    loader: &ConfigLoader,
    factories: &FactoryRegistry,
    extra: &[PathBuf],
) -> Result<RuleSet> {
    let (rules, rejected) = loader.build_rule_set(factories, extra)?;
    for err in &rejected {
        warn!(code = ?err.code(), "{}", err);
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolve_command() {
        let cli = Cli::try_parse_from([
            "viz-rules",
            "--log",
            "off",
            "resolve",
            "pentaho/ccc/visual/Bar",
            "-a",
            "pentaho-analyzer",
            "--dep",
            r#"environment={"locale":"de-DE"}"#,
            "--explain",
        ])
        .unwrap();

        assert_eq!(cli.log, "off");
        match cli.command {
            Command::Resolve(args) => {
                assert_eq!(args.module, "pentaho/ccc/visual/Bar");
                assert_eq!(args.application.as_deref(), Some("pentaho-analyzer"));
                assert_eq!(args.deps.len(), 1);
                assert!(args.explain);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_check_with_global_flags_after() {
        let cli = Cli::try_parse_from(["viz-rules", "check", "a.yaml", "b.yaml", "--verbose"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Check(args) => assert_eq!(args.files.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["viz-rules"]).is_err());
    }
}
