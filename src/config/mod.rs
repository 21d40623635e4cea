//! Analysis Configuration Module
//!
//! Provides decline-analysis tuning loaded from TOML files, replacing the
//! hardcoded pipeline constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `DECLINA_CONFIG` environment variable (path to TOML file)
//! 2. `declina.toml` in the current working directory
//! 3. Built-in defaults (matching original hardcoded values)
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(AnalysisConfig::load());
//!
//! // Anywhere in the codebase:
//! let epsilon = config::get().fit.zero_substitution_epsilon;
//! ```

mod analysis_config;

pub use analysis_config::*;

use std::sync::OnceLock;

/// Global analysis configuration, initialized once at startup.
static ANALYSIS_CONFIG: OnceLock<AnalysisConfig> = OnceLock::new();

/// Initialize the global analysis configuration.
///
/// Must be called exactly once before any calls to `get()`.
pub fn init(config: AnalysisConfig) {
    if ANALYSIS_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global analysis configuration.
///
/// Falls back to built-in defaults when `init()` was never called, so
/// library consumers and tests do not have to run the startup path.
pub fn get() -> &'static AnalysisConfig {
    ANALYSIS_CONFIG.get_or_init(AnalysisConfig::default)
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    ANALYSIS_CONFIG.get().is_some()
}
