//! Settings.
//!
//! Consolidates settings from tiers with field-by-field YAML merging:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/viz-rules/config.yaml`
//! 3. **User** - `~/.viz-rules/config.yaml`
//! 4. **Environment** - variables below
//!
//! Each tier directory may also hold a `rules.yaml`, appended to the rule set.
//!
//! ## Environment Variables
//! - `VIZ_RULES_CONFIG_PATH` - Explicit settings file (replaces project and user tiers)
//! - `VIZ_RULES_USER_DIR` - User dir (default: `~/.viz-rules`)
//! - `VIZ_RULES_PROJECT_DIR` - Project dir (default: `./viz-rules`)
//! - `VIZ_RULES_LOCALE` - Sets `dependencies.environment.locale`
//! - `VIZ_RULES_ON_DEPENDENCY_ERROR` - `abort` or `skip`

mod loader;
mod types;

pub use loader::{CONFIG_FILE, ConfigLoader, ConfigPaths, ConfigTier, RULES_FILE};
pub use types::*;
