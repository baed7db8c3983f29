//! Settings loader with tier-based merging.
//!
//! Loads settings from multiple tiers and merges them field-by-field.

use super::types::Config;
use crate::error::RuleError;
use crate::merge::deep_merge_all;
use crate::rules::{FactoryRegistry, RuleSet, RuleSetBuilder};
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Settings file name inside a tier directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Rule file name inside a tier directory.
pub const RULES_FILE: &str = "rules.yaml";

/// Settings tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Compiled-in defaults (lowest priority)
    Defaults = 0,
    /// Project-level settings ($CWD/viz-rules/)
    Project = 1,
    /// User-level settings (~/.viz-rules/)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories for each settings tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover directories from environment and defaults.
    pub fn discover() -> Self {
        // User dir: VIZ_RULES_USER_DIR or ~/.viz-rules
        let user_dir = std::env::var("VIZ_RULES_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".viz-rules")));

        // Project dir: VIZ_RULES_PROJECT_DIR or $CWD/viz-rules
        let project_dir = std::env::var("VIZ_RULES_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("viz-rules")));

        Self {
            project_dir,
            user_dir,
        }
    }

    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }

    /// Tier directories that exist, lowest priority first.
    fn tiers(&self) -> impl Iterator<Item = (ConfigTier, &Path)> {
        [
            (ConfigTier::Project, self.project_dir.as_deref()),
            (ConfigTier::User, self.user_dir.as_deref()),
        ]
        .into_iter()
        .filter_map(|(tier, dir)| dir.map(|d| (tier, d)))
    }
}

/// Settings loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Settings files that contributed, lowest tier first
    sources: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Load settings from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load settings with explicit tier directories.
    ///
    /// `VIZ_RULES_CONFIG_PATH`, when set, replaces the project and user tiers.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        if let Ok(explicit_path) = std::env::var("VIZ_RULES_CONFIG_PATH") {
            return Self::load_from(paths, PathBuf::from(explicit_path));
        }

        let mut configs: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut sources = Vec::new();

        for (tier, dir) in paths.tiers() {
            let config_file = dir.join(CONFIG_FILE);
            if !config_file.exists() {
                continue;
            }
            match read_yaml(&config_file) {
                Ok(value) => {
                    debug!(%tier, path = %config_file.display(), "Loaded settings tier");
                    configs.push(value);
                    sources.push(config_file);
                }
                Err(e) => {
                    warn!(%tier, path = %config_file.display(), error = %e, "Ignoring unreadable settings file");
                }
            }
        }

        let merged = deep_merge_all(configs);
        let mut config: Config = serde_json::from_value(merged)?;
        Self::apply_env_overrides(&mut config);

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Load a single settings file on top of the defaults.
    pub fn load_from(paths: ConfigPaths, path: PathBuf) -> Result<Self> {
        let mut config = Config::load(&path)?;
        Self::apply_env_overrides(&mut config);
        Ok(Self {
            paths,
            config,
            sources: vec![path],
        })
    }

    /// Apply environment variable overrides to settings.
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(locale) = std::env::var("VIZ_RULES_LOCALE") {
            config.set_locale(&locale);
        }

        if let Ok(policy) = std::env::var("VIZ_RULES_ON_DEPENDENCY_ERROR") {
            match policy.parse() {
                Ok(policy) => config.resolver.on_dependency_error = policy,
                Err(e) => warn!(error = %e, "Ignoring VIZ_RULES_ON_DEPENDENCY_ERROR"),
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Settings files that were merged, lowest tier first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Rule files to load after the builtin rules, in application order.
    ///
    /// Configured files come first, then `rules.yaml` from the project and
    /// user directories when present.
    pub fn rule_files(&self) -> Vec<PathBuf> {
        let mut files = self.config.rules.files.clone();
        files.extend(
            self.paths
                .tiers()
                .map(|(_, dir)| dir.join(RULES_FILE))
                .filter(|path| path.exists()),
        );
        files
    }

    /// Build the rule set described by the settings, followed by `extra` files.
    ///
    /// Returns the rules together with any rejected under the skip policy.
    pub fn build_rule_set(
        &self,
        factories: &FactoryRegistry,
        extra: &[PathBuf],
    ) -> Result<(RuleSet, Vec<RuleError>)> {
        let mut builder = RuleSetBuilder::new(factories).with_policy(self.config.rules.on_malformed);
        if self.config.rules.builtin {
            builder.add_builtin()?;
        }
        for path in self.rule_files().iter().chain(extra) {
            builder.add_file(path)?;
        }
        Ok(builder.finish())
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_yaml::from_str(&content)?)
}
