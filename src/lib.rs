//! Visualization style rules
//!
//! Resolves the effective default configuration for a visualization module in
//! a host application by merging every matching rule in priority order.
//!
//! ```
//! use viz_style_rules::resolver::resolve;
//! use viz_style_rules::rules::{RuleSet, Target};
//!
//! let rules = RuleSet::builtin().unwrap();
//! let target = Target::new("pentaho/ccc/visual/Abstract").with_application("pentaho/det");
//! let resolved = resolve(&target, &rules).unwrap();
//! assert_eq!(resolved.pointer("/extension/selectable"), Some(&serde_json::Value::Bool(false)));
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod merge;
pub mod registry;
pub mod resolver;
pub mod rules;

pub use error::{ErrorCode, ErrorReport, RuleError, RuleResult, RuleSource};
pub use registry::RuleRegistry;
pub use resolver::{DependencyResolver, FailurePolicy, MapDependencies, ResolvedConfig, Resolver};
pub use rules::{Priority, Rule, RuleSet, Selector, Target};
