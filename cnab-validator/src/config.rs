//! Configuration for a validation run

use crate::types::Severity;
use serde::{Deserialize, Serialize};

/// Lowest accepted century base
pub const MIN_CENTURY_BASE: i32 = 1800;

/// Highest accepted century base
pub const MAX_CENTURY_BASE: i32 = 2099;

/// Validation run configuration
///
/// Resolved once before a run and held immutable for its duration. Every
/// transform and record rule that needs it receives it by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Added to 2-digit years in DDMMAA dates (e.g. 1900 or 2000)
    pub century_base: i32,

    /// Validate the Nosso Número check digit
    pub validate_check_digit: bool,

    /// Maximum absolute difference, in cents, between a declared trailer
    /// total and the summed detail values
    pub tolerance_cents: u64,

    /// Output filter applied by callers after the run
    pub min_severity: Severity,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            century_base: 2000,
            validate_check_digit: false,
            tolerance_cents: 0,
            min_severity: Severity::Field,
        }
    }
}

impl ValidationConfig {
    /// Create a configuration with the given century base
    pub fn new(century_base: i32) -> crate::Result<Self> {
        let config = Self {
            century_base,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Enable or disable the check-digit rule
    pub fn with_check_digit(mut self, enabled: bool) -> Self {
        self.validate_check_digit = enabled;
        self
    }

    /// Set the reconciliation tolerance in cents
    pub fn with_tolerance_cents(mut self, cents: u64) -> Self {
        self.tolerance_cents = cents;
        self
    }

    /// Set the caller-side severity filter
    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> crate::Result<()> {
        if !(MIN_CENTURY_BASE..=MAX_CENTURY_BASE).contains(&self.century_base) {
            return Err(crate::Error::Config(format!(
                "century base {} outside {}..={}",
                self.century_base, MIN_CENTURY_BASE, MAX_CENTURY_BASE
            )));
        }
        Ok(())
    }

    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ValidationConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables on top of the defaults
    pub fn from_env() -> crate::Result<Self> {
        let mut config = ValidationConfig::default();

        if let Ok(base) = std::env::var("CNAB_CENTURY_BASE") {
            config.century_base = base
                .trim()
                .parse()
                .map_err(|_| crate::Error::Config(format!("CNAB_CENTURY_BASE: '{}'", base)))?;
        }

        if let Ok(flag) = std::env::var("CNAB_VALIDATE_CHECK_DIGIT") {
            config.validate_check_digit = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Ok(cents) = std::env::var("CNAB_TOLERANCE_CENTS") {
            config.tolerance_cents = cents
                .trim()
                .parse()
                .map_err(|_| crate::Error::Config(format!("CNAB_TOLERANCE_CENTS: '{}'", cents)))?;
        }

        if let Ok(severity) = std::env::var("CNAB_MIN_SEVERITY") {
            config.min_severity = severity.parse()?;
        }

        config.validate()?;
        Ok(config)
    }
}
