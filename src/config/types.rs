//! Settings types.
//!
//! Every field has a default so a partial YAML file (or none at all) is valid.

use crate::format::OutputFormat;
use crate::registry::RuleRegistry;
use crate::resolver::{FailurePolicy, MapDependencies, Resolver};
use crate::rules::{DEFAULT_LOCALE, LoadPolicy, RuleSet};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// Name of the dependency carrying locale and host information.
pub const ENVIRONMENT_DEPENDENCY: &str = "environment";

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Static values offered to dynamic rules, by dependency name.
    #[serde(default = "default_dependencies")]
    pub dependencies: MapDependencies,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules: RulesConfig::default(),
            resolver: ResolverConfig::default(),
            dependencies: default_dependencies(),
            output: OutputConfig::default(),
        }
    }
}

fn default_dependencies() -> MapDependencies {
    MapDependencies::new().with(ENVIRONMENT_DEPENDENCY, json!({"locale": DEFAULT_LOCALE}))
}

/// Where rules come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Include the embedded default rules (default: true).
    #[serde(default = "default_true")]
    pub builtin: bool,

    /// Extra rule files, loaded in order after the builtin rules.
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// What to do with malformed rules (default: abort).
    #[serde(default)]
    pub on_malformed: LoadPolicy,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            files: Vec::new(),
            on_malformed: LoadPolicy::default(),
        }
    }
}

/// Resolution behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// What to do when a dynamic rule's dependency is missing (default: abort).
    #[serde(default)]
    pub on_dependency_error: FailurePolicy,

    /// Memoize resolutions per target (default: true).
    #[serde(default = "default_true")]
    pub cache: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            on_dependency_error: FailurePolicy::default(),
            cache: true,
        }
    }
}

/// Output settings for the command line.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load settings from a single file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        Ok(config)
    }

    /// A resolver honoring the configured failure policy.
    pub fn resolver(&self) -> Resolver {
        Resolver::new().with_policy(self.resolver.on_dependency_error)
    }

    /// A registry over `rules` honoring the failure policy and cache switch.
    pub fn registry(&self, rules: RuleSet) -> RuleRegistry {
        RuleRegistry::new(rules)
            .with_policy(self.resolver.on_dependency_error)
            .with_cache(self.resolver.cache)
    }

    /// Set `environment.locale`, keeping any other environment fields.
    pub fn set_locale(&mut self, locale: &str) {
        let mut environment = self
            .dependencies
            .get(ENVIRONMENT_DEPENDENCY)
            .filter(|v| v.is_object())
            .cloned()
            .unwrap_or_else(|| json!({}));
        environment["locale"] = Value::String(locale.to_string());
        self.dependencies.insert(ENVIRONMENT_DEPENDENCY, environment);
    }
}
