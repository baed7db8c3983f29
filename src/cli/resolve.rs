//! Resolve subcommand for viz-rules CLI
//!
//! Prints the effective configuration for one module and application.

use crate::config::ConfigLoader;
use crate::format::{OutputFormat, format_config};
use crate::resolver::FailurePolicy;
use crate::rules::{FactoryRegistry, Target};
use anyhow::Result;
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

/// Arguments for the resolve subcommand
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Visualization module identifier, e.g. pentaho/ccc/visual/Bar
    #[arg(value_name = "MODULE")]
    pub module: String,

    /// Host application identifier
    #[arg(short, long, value_name = "APPLICATION")]
    pub application: Option<String>,

    /// Additional rule files, loaded after the configured ones
    #[arg(long = "rules", value_name = "FILE")]
    pub rules: Vec<PathBuf>,

    /// Dependency value for dynamic rules; VALUE is JSON or a bare string
    #[arg(long = "dep", value_name = "NAME=VALUE", value_parser = parse_dependency)]
    pub deps: Vec<(String, Value)>,

    /// What to do when a dependency cannot be resolved (overrides settings)
    #[arg(long, value_name = "POLICY")]
    pub on_dependency_error: Option<FailurePolicy>,

    /// Output format: json, yaml, or markdown (overrides settings)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Also print the applied and skipped rules
    #[arg(long)]
    pub explain: bool,
}

/// Parse `NAME=VALUE`, reading VALUE as JSON when possible.
pub fn parse_dependency(s: &str) -> Result<(String, Value), String> {
    let (name, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing dependency name in '{}'", s));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

impl ResolveArgs {
    pub fn target(&self) -> Target {
        let target = Target::new(&self.module);
        match self.application {
            Some(ref app) => target.with_application(app),
            None => target,
        }
    }

    /// Resolve and render the configuration.
    pub fn run(&self, loader: &ConfigLoader, factories: &FactoryRegistry) -> Result<String> {
        let config = loader.config();
        let rules = super::load_rule_set(loader, factories, &self.rules)?;

        let mut deps = config.dependencies.clone();
        for (name, value) in &self.deps {
            deps.insert(name.clone(), value.clone());
        }

        let policy = self
            .on_dependency_error
            .unwrap_or(config.resolver.on_dependency_error);
        let registry = config.registry(rules).with_policy(policy);
        let resolved = registry.resolve(&self.target(), &deps)?;

        format_config(
            &resolved,
            self.format.unwrap_or(config.output.format),
            self.explain,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_dependency() {
        assert_eq!(
            parse_dependency(r#"environment={"locale":"fr-FR"}"#).unwrap(),
            ("environment".to_string(), json!({"locale": "fr-FR"}))
        );
        assert_eq!(
            parse_dependency("locale=fr-FR").unwrap(),
            ("locale".to_string(), json!("fr-FR"))
        );
        assert_eq!(
            parse_dependency("count=3").unwrap(),
            ("count".to_string(), json!(3))
        );
        assert!(parse_dependency("no-equals").is_err());
        assert!(parse_dependency("=1").is_err());
    }

    #[test]
    fn test_target() {
        let args = ResolveArgs {
            module: "m".to_string(),
            application: Some("app".to_string()),
            rules: Vec::new(),
            deps: Vec::new(),
            on_dependency_error: None,
            format: None,
            explain: false,
        };
        assert_eq!(args.target(), Target::new("m").with_application("app"));
    }
}
