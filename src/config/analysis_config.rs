//! Analysis Configuration - decline pipeline tuning as operator-editable TOML values
//!
//! The pipeline constants (zero-substitution epsilon, trailing trim, peak
//! window, default extrapolation horizon) carry domain convention rather
//! than derived values, so they live here instead of in code. Each struct
//! implements `Default` with values matching the original constants,
//! ensuring zero-change behavior when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a decline analysis deployment.
///
/// Load with `AnalysisConfig::load()` which searches:
/// 1. `$DECLINA_CONFIG` env var
/// 2. `./declina.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Exponential regression tuning
    #[serde(default)]
    pub fit: FitConfig,

    /// Automatic peak detection
    #[serde(default)]
    pub peak: PeakConfig,

    /// Decline segment extraction
    #[serde(default)]
    pub segment: SegmentConfig,

    /// Forward projection defaults
    #[serde(default)]
    pub extrapolation: ExtrapolationConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fit: FitConfig::default(),
            peak: PeakConfig::default(),
            segment: SegmentConfig::default(),
            extrapolation: ExtrapolationConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration using the standard search order:
    /// 1. `$DECLINA_CONFIG` environment variable
    /// 2. `./declina.toml` in the current working directory
    /// 3. Built-in defaults (original hardcoded values)
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var("DECLINA_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded analysis config from DECLINA_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from DECLINA_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "DECLINA_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./declina.toml
        let local = PathBuf::from("declina.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded analysis config from ./declina.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./declina.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No declina.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Write the current config to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Ok(())
    }

    /// Validate cross-field invariants. Returns all violations, not just the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if !self.fit.zero_substitution_epsilon.is_finite()
            || self.fit.zero_substitution_epsilon <= 0.0
        {
            errors.push(format!(
                "fit.zero_substitution_epsilon ({}) must be a finite positive number",
                self.fit.zero_substitution_epsilon
            ));
        }
        if self.fit.zero_substitution_epsilon >= 1.0 {
            errors.push(format!(
                "fit.zero_substitution_epsilon ({}) must be well below typical production values (< 1.0)",
                self.fit.zero_substitution_epsilon
            ));
        }
        if self.fit.min_segment_samples < 2 {
            errors.push(format!(
                "fit.min_segment_samples ({}) must be at least 2 for the regression to be determined",
                self.fit.min_segment_samples
            ));
        }
        if self.peak.window_months == 0 {
            errors.push("peak.window_months must be at least 1".to_string());
        }
        if self.extrapolation.default_months == 0 {
            errors.push("extrapolation.default_months must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Fit
// ============================================================================

/// Exponential regression tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitConfig {
    /// Value substituted for zero/missing/NaN samples before the log-linear
    /// fit (log of zero is undefined). Materially affects fitted decline
    /// rates for segments with near-zero trailing samples.
    #[serde(default = "default_epsilon")]
    pub zero_substitution_epsilon: f64,

    /// Minimum valid samples a segment must retain after trimming/filtering
    /// for the fit to run.
    #[serde(default = "default_min_segment_samples")]
    pub min_segment_samples: usize,
}

fn default_epsilon() -> f64 {
    0.0001
}

fn default_min_segment_samples() -> usize {
    3
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            zero_substitution_epsilon: default_epsilon(),
            min_segment_samples: default_min_segment_samples(),
        }
    }
}

// ============================================================================
// Peak Detection
// ============================================================================

/// Automatic peak detection over the recent production history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakConfig {
    /// Trailing window (in monthly samples) scanned for the default decline
    /// start point. The whole series is used when shorter.
    #[serde(default = "default_peak_window")]
    pub window_months: usize,
}

fn default_peak_window() -> usize {
    60
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            window_months: default_peak_window(),
        }
    }
}

// ============================================================================
// Segment Extraction
// ============================================================================

/// Decline segment extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Trailing samples dropped from every raw segment before fitting.
    /// The last months of reported production are routinely incomplete
    /// (partial-month reporting), so they would bias the decline rate.
    #[serde(default = "default_trailing_trim")]
    pub trailing_trim_months: usize,
}

fn default_trailing_trim() -> usize {
    5
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            trailing_trim_months: default_trailing_trim(),
        }
    }
}

// ============================================================================
// Extrapolation
// ============================================================================

/// Forward projection defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrapolationConfig {
    /// Default forward horizon (months) for new editable curves.
    #[serde(default = "default_extrapolation_months")]
    pub default_months: u32,
}

fn default_extrapolation_months() -> u32 {
    12
}

impl Default for ExtrapolationConfig {
    fn default() -> Self {
        Self {
            default_months: default_extrapolation_months(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: AnalysisConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.fit.zero_substitution_epsilon, 0.0001);
        assert_eq!(config.fit.min_segment_samples, 3);
        assert_eq!(config.peak.window_months, 60);
        assert_eq!(config.segment.trailing_trim_months, 5);
        assert_eq!(config.extrapolation.default_months, 12);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[peak]
window_months = 36

[segment]
trailing_trim_months = 3
"#;
        let config: AnalysisConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        // Overridden values
        assert_eq!(config.peak.window_months, 36);
        assert_eq!(config.segment.trailing_trim_months, 3);
        // Non-overridden values retain defaults
        assert_eq!(config.fit.zero_substitution_epsilon, 0.0001);
        assert_eq!(config.extrapolation.default_months, 12);
    }

    #[test]
    fn test_validation_catches_bad_epsilon() {
        let mut config = AnalysisConfig::default();
        config.fit.zero_substitution_epsilon = 0.0;
        let result = config.validate();
        assert!(result.is_err(), "Zero epsilon should fail validation");
        if let Err(ConfigError::Validation(errors)) = result {
            assert!(errors.iter().any(|e| e.contains("zero_substitution_epsilon")));
        }
    }

    #[test]
    fn test_validation_catches_degenerate_min_samples() {
        let mut config = AnalysisConfig::default();
        config.fit.min_segment_samples = 1;
        assert!(config.validate().is_err(), "min_segment_samples=1 should fail");
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = AnalysisConfig::default();
        let serialized = config.to_toml().expect("default config should serialize");
        let parsed: AnalysisConfig = toml::from_str(&serialized).expect("round trip should parse");
        assert_eq!(parsed.peak.window_months, config.peak.window_months);
        assert_eq!(
            parsed.fit.zero_substitution_epsilon,
            config.fit.zero_substitution_epsilon
        );
    }

    #[test]
    fn test_save_then_load_from_file() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("declina.toml");

        let mut config = AnalysisConfig::default();
        config.peak.window_months = 48;
        config.save_to_file(&path).expect("save should succeed");

        let loaded = AnalysisConfig::load_from_file(&path).expect("load should succeed");
        assert_eq!(loaded.peak.window_months, 48);
        assert_eq!(
            loaded.segment.trailing_trim_months, 5,
            "untouched sections come back as defaults"
        );
    }
}
