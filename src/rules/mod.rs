//! Rule model and rule loading.
//!
//! A rule pairs a selector (which module/application it targets) with a
//! payload (what it contributes) and a priority (when it applies).
//!
//! ## Sources
//! - **Builtin** - `config/rules.yaml`, embedded at build time
//! - **Files** - YAML/JSON documents listed in settings or on the command line
//! - **Project/User** - `rules.yaml` in the project and user config directories
//!
//! Sources concatenate in that order.

mod builtin;
mod factories;
mod loader;
mod parse;
mod types;

pub use builtin::{BUILTIN_RULES, builtin_rules};
pub use factories::{DEFAULT_LOCALE, FactoryRegistry};
pub use loader::RuleSetBuilder;
pub use parse::{LoadPolicy, ParsedRules, parse_priority, parse_rule, parse_rules, parse_rules_str};
pub use types::*;
