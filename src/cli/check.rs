//! Check subcommand for viz-rules CLI
//!
//! Validates rule documents, collecting every problem instead of stopping at
//! the first.

use crate::config::ConfigLoader;
use crate::error::ErrorReport;
use crate::format::OutputFormat;
use crate::rules::{FactoryRegistry, LoadPolicy, RuleSetBuilder};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the check subcommand
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Rule files to check (default: the configured rule set)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Output format: json, yaml, or markdown (overrides settings)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,
}

/// Outcome of a check run.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    /// Documents examined; `builtin` stands for the embedded rules.
    pub documents: Vec<String>,
    /// Rules that loaded cleanly.
    pub valid: usize,
    pub errors: Vec<ErrorReport>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            OutputFormat::Markdown => Ok(self.render_markdown()),
        }
    }

    fn render_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str(&format!(
            "# Check: {} valid, {} errors\n\n",
            self.valid,
            self.errors.len()
        ));
        for doc in &self.documents {
            md.push_str(&format!("- `{}`\n", doc));
        }
        if !self.errors.is_empty() {
            md.push_str("\n## Errors\n\n");
            for err in &self.errors {
                md.push_str(&format!("- **{:?}**: {}\n", err.code, err.message));
            }
        }
        md
    }
}

impl CheckArgs {
    /// Check the given files, or the configured rule set when none are given.
    pub fn check(&self, loader: &ConfigLoader, factories: &FactoryRegistry) -> CheckReport {
        let mut builder = RuleSetBuilder::new(factories).with_policy(LoadPolicy::Skip);
        let mut documents = Vec::new();
        let mut errors = Vec::new();

        let files = if self.files.is_empty() {
            if loader.config().rules.builtin {
                documents.push("builtin".to_string());
                if let Err(e) = builder.add_builtin() {
                    errors.push(e.report());
                }
            }
            loader.rule_files()
        } else {
            self.files.clone()
        };

        for path in &files {
            documents.push(path.display().to_string());
            // Read and parse failures stop only the current document
            if let Err(e) = builder.add_file(path) {
                errors.push(e.report());
            }
        }

        errors.extend(builder.rejected().iter().map(|e| e.report()));
        let (rules, _) = builder.finish();

        CheckReport {
            documents,
            valid: rules.len(),
            errors,
        }
    }

    pub fn format(&self, loader: &ConfigLoader) -> OutputFormat {
        self.format.unwrap_or(loader.config().output.format)
    }
}
