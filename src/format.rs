//! Output formatting for resolved configurations and rule listings.

use crate::error::{ErrorReport, RuleSource};
use crate::resolver::ResolvedConfig;
use crate::rules::{ApplyPayload, Priority, Rule, Selector};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!(
                "Invalid format '{}'. Valid options: json, yaml, markdown",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// One row of a rule listing.
#[derive(Debug, Serialize)]
pub struct RuleSummary<'a> {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    pub priority: Priority,
    pub select: &'a Selector,
    /// Factory name for dynamic rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory: Option<&'a str>,
    #[serde(skip_serializing_if = "no_deps")]
    pub deps: &'a [String],
    pub origin: &'a RuleSource,
}

fn no_deps(deps: &&[String]) -> bool {
    deps.is_empty()
}

impl<'a> RuleSummary<'a> {
    pub fn new(index: usize, rule: &'a Rule) -> Self {
        let (factory, deps) = match rule.apply() {
            ApplyPayload::Static(_) => (None, &[][..]),
            ApplyPayload::Dynamic {
                dependencies,
                factory,
            } => (Some(factory.name()), dependencies.as_slice()),
        };
        Self {
            index,
            name: rule.name(),
            priority: rule.priority(),
            select: rule.select(),
            factory,
            deps,
            origin: rule.origin(),
        }
    }
}

/// Format a resolution.
///
/// With `explain`, the contributing and skipped rules are included.
pub fn format_config(resolved: &ResolvedConfig, format: OutputFormat, explain: bool) -> Result<String> {
    match format {
        OutputFormat::Json if explain => Ok(serde_json::to_string_pretty(resolved)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&resolved.values)?),
        OutputFormat::Yaml if explain => Ok(serde_yaml::to_string(resolved)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&resolved.values)?),
        OutputFormat::Markdown => format_config_markdown(resolved, explain),
    }
}

fn format_config_markdown(resolved: &ResolvedConfig, explain: bool) -> Result<String> {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", resolved.target));
    md.push_str("```json\n");
    md.push_str(&serde_json::to_string_pretty(&resolved.values)?);
    md.push_str("\n```\n");

    if explain {
        md.push_str(&format!("\n## Applied rules ({})\n\n", resolved.applied.len()));
        for applied in &resolved.applied {
            md.push_str(&format!(
                "- #{} {} (priority {}, {})\n",
                applied.index,
                applied.name.as_deref().unwrap_or("unnamed"),
                applied.priority,
                applied.origin
            ));
        }

        if !resolved.skipped.is_empty() {
            md.push_str(&format!("\n## Skipped rules ({})\n\n", resolved.skipped.len()));
            for skipped in &resolved.skipped {
                md.push_str(&format!(
                    "- #{} {}: {}\n",
                    skipped.index,
                    skipped.name.as_deref().unwrap_or("unnamed"),
                    skipped.reason
                ));
            }
        }
    }

    Ok(md)
}

/// Format rules in the order given.
pub fn format_rules(rules: &[(usize, &Rule)], format: OutputFormat) -> Result<String> {
    let summaries: Vec<RuleSummary<'_>> = rules
        .iter()
        .map(|(index, rule)| RuleSummary::new(*index, rule))
        .collect();

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&summaries)?),
        OutputFormat::Markdown => Ok(format_rules_markdown(&summaries)),
    }
}

fn format_rules_markdown(summaries: &[RuleSummary<'_>]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Rules ({})\n\n", summaries.len()));
    md.push_str("| # | Name | Priority | Modules | Applications | Payload | Source |\n");
    md.push_str("|---|------|----------|---------|--------------|---------|--------|\n");

    for summary in summaries {
        let applications = summary
            .select
            .application
            .as_ref()
            .map(|apps| apps.to_string())
            .unwrap_or_else(|| "*".to_string());
        let payload = match summary.factory {
            Some(factory) => format!("`{}`({})", factory, summary.deps.join(", ")),
            None => "static".to_string(),
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            summary.index,
            summary.name.unwrap_or(""),
            summary.priority,
            summary.select.module,
            applications,
            payload,
            summary.origin
        ));
    }

    md
}

/// Format an error report. Markdown falls back to a plain line.
pub fn format_error(report: &ErrorReport, format: OutputFormat) -> String {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(report).ok(),
        OutputFormat::Yaml => serde_yaml::to_string(report).ok(),
        OutputFormat::Markdown => None,
    };
    rendered.unwrap_or_else(|| format!("error: {}", report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::resolver::{AppliedRule, resolve};
    use crate::rules::{Factory, RuleSet, Target};
    use serde_json::{Map, Value, json};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("YML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
    }

    #[test]
    fn test_format_config_json_values_only() {
        let rules = RuleSet::new(vec![Rule::with_static(
            Selector::module("m"),
            object(json!({"a": 1})),
        )]);
        let resolved = resolve(&Target::new("m"), &rules).unwrap();

        let out = format_config(&resolved, OutputFormat::Json, false).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), json!({"a": 1}));

        let explained = format_config(&resolved, OutputFormat::Json, true).unwrap();
        let explained: Value = serde_json::from_str(&explained).unwrap();
        assert_eq!(explained["values"], json!({"a": 1}));
        assert_eq!(explained["applied"][0]["index"], 0);
        assert_eq!(explained["target"]["module"], "m");
    }

    #[test]
    fn test_format_config_markdown_explain() {
        let resolved = ResolvedConfig {
            target: Target::new("m").with_application("app"),
            values: json!({"a": 1}),
            applied: vec![AppliedRule {
                index: 2,
                name: Some("base".to_string()),
                priority: Priority::VIZ_DEFAULT,
                origin: RuleSource::Builtin,
            }],
            skipped: Vec::new(),
        };
        let md = format_config(&resolved, OutputFormat::Markdown, true).unwrap();
        assert!(md.starts_with("# m (application app)\n"));
        assert!(md.contains("- #2 base (priority -5, builtin)"));
        assert!(!md.contains("Skipped"));
    }

    #[test]
    fn test_format_rules_markdown_table() {
        let dynamic = Rule::new(
            Selector::module("m").with_application(["a", "b"]),
            ApplyPayload::Dynamic {
                dependencies: vec!["environment".to_string()],
                factory: Factory::new("fmt", |_| Map::new()),
            },
        )
        .with_priority(Priority::INFINITY)
        .with_name("dyn");
        let rules = RuleSet::new(vec![dynamic]);

        let md = format_rules(&rules.ordered(), OutputFormat::Markdown).unwrap();
        assert!(md.contains("# Rules (1)"));
        assert!(md.contains("| 0 | dyn | Infinity | m | a, b | `fmt`(environment) | inline |"));

        let json: Value =
            serde_json::from_str(&format_rules(&rules.ordered(), OutputFormat::Json).unwrap())
                .unwrap();
        assert_eq!(json[0]["priority"], "Infinity");
        assert_eq!(json[0]["factory"], "fmt");
        assert_eq!(json[0]["deps"], json!(["environment"]));
    }

    #[test]
    fn test_format_error() {
        let report = ErrorReport::new(ErrorCode::ParseError, "cannot parse inline: bad");
        let json: Value =
            serde_json::from_str(&format_error(&report, OutputFormat::Json)).unwrap();
        assert_eq!(json["code"], "PARSE_ERROR");
        assert_eq!(
            format_error(&report, OutputFormat::Markdown),
            "error: cannot parse inline: bad"
        );
    }
}
