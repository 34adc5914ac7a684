use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::error::{Error, Result};
use crate::mutation::EditOptions;

/// Limits and switches for the orchestration loop.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use formwright::orchestrator::OrchestratorConfig;
///
/// // Create with defaults
/// let config = OrchestratorConfig::default();
/// assert_eq!(config.max_iterations, 15);
///
/// // Or customize
/// let config = OrchestratorConfig::new()
///     .with_max_iterations(5)
///     .with_oracle_timeout(Duration::from_secs(10))
///     .with_fallback_to_oracle(false);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Entries into the reasoning step before the run is aborted
    pub max_iterations: usize,
    /// Retries allowed per kind of failing attempt
    pub max_retries: usize,
    /// Upper bound on a single oracle call, in milliseconds when serialized
    #[serde(
        rename = "oracle_timeout_ms",
        serialize_with = "serialize_millis",
        deserialize_with = "deserialize_millis"
    )]
    pub oracle_timeout: Duration,
    /// Hand control to the oracle when a planned operation fails
    pub fallback_to_oracle: bool,
    /// Keys listed per sheet in the summary given to the oracle
    pub summary_key_limit: usize,
    pub edit: EditOptions,
}

fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
}

fn deserialize_millis<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            max_retries: 2,
            oracle_timeout: Duration::from_secs(30),
            fallback_to_oracle: true,
            summary_key_limit: 50,
            edit: EditOptions::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Create a new `OrchestratorConfig` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a configuration from YAML. Missing keys keep their defaults.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use formwright::orchestrator::OrchestratorConfig;
    ///
    /// let config = OrchestratorConfig::from_yaml_str(
    ///     "max_iterations: 4\noracle_timeout_ms: 1500\nedit:\n  strict_rename: true\n",
    /// )?;
    /// assert_eq!(config.max_iterations, 4);
    /// assert_eq!(config.oracle_timeout, Duration::from_millis(1500));
    /// assert!(config.edit.strict_rename);
    /// assert_eq!(config.max_retries, 2);
    /// # Ok::<(), formwright::Error>(())
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_saphyr::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be at least 1".to_string()));
        }
        if self.oracle_timeout.is_zero() {
            return Err(Error::Config("oracle_timeout must be positive".to_string()));
        }
        Ok(())
    }

    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[inline]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[inline]
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    /// Set whether a failing planned operation hands control to the oracle.
    ///
    /// When disabled, the failure ends the run.
    #[inline]
    pub fn with_fallback_to_oracle(mut self, fallback: bool) -> Self {
        self.fallback_to_oracle = fallback;
        self
    }

    #[inline]
    pub fn with_summary_key_limit(mut self, limit: usize) -> Self {
        self.summary_key_limit = limit;
        self
    }

    #[inline]
    pub fn with_edit_options(mut self, edit: EditOptions) -> Self {
        self.edit = edit;
        self
    }
}
