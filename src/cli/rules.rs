//! Rules subcommand for viz-rules CLI
//!
//! Lists loaded rules in the order they would be applied.

use crate::config::ConfigLoader;
use crate::format::{OutputFormat, format_rules};
use crate::rules::{FactoryRegistry, Rule, RuleSet, Target};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the rules subcommand
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Only list rules matching this module
    #[arg(short, long, value_name = "MODULE")]
    pub module: Option<String>,

    /// Only list rules that can apply to this application
    #[arg(short, long, value_name = "APPLICATION")]
    pub application: Option<String>,

    /// Additional rule files, loaded after the configured ones
    #[arg(long = "rules", value_name = "FILE")]
    pub rules: Vec<PathBuf>,

    /// Output format: json, yaml, or markdown (overrides settings)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,
}

impl RulesArgs {
    /// Rules to list, in application order.
    ///
    /// With a module this is exactly the set a resolution would apply.
    /// With only an application, rules scoped to other applications are left out.
    pub fn select<'a>(&self, rules: &'a RuleSet) -> Vec<(usize, &'a Rule)> {
        match (&self.module, &self.application) {
            (Some(module), app) => {
                let target = Target::new(module);
                let target = match app {
                    Some(app) => target.with_application(app),
                    None => target,
                };
                rules.applicable(&target)
            }
            (None, Some(app)) => rules
                .ordered()
                .into_iter()
                .filter(|(_, rule)| {
                    rule.select()
                        .application
                        .as_ref()
                        .is_none_or(|apps| apps.contains(app))
                })
                .collect(),
            (None, None) => rules.ordered(),
        }
    }

    pub fn run(&self, loader: &ConfigLoader, factories: &FactoryRegistry) -> Result<String> {
        let rules = super::load_rule_set(loader, factories, &self.rules)?;
        let selected = self.select(&rules);
        format_rules(
            &selected,
            self.format.unwrap_or(loader.config().output.format),
        )
    }
}
